//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples assignment logic from system resources
//! (wall-clock time and randomness). This enables:
//!
//! - Deterministic Simulation: the harness provides a virtual clock and a
//!   seeded RNG, so a failing shuffle can be replayed exactly.
//!
//! - Production Runtime: the server uses the system clock and OS entropy
//!   without any change to the engine.
//!
//! # Invariants
//!
//! - Determinism: Given the same seed, `random_bytes()` produces the same
//!   sequence
//! - Isolation: Implementations must not share global state

use std::time::SystemTime;

/// Abstract environment providing time and randomness.
///
/// The shuffle engine draws every random decision through this trait, so the
/// engine itself stays a pure function of its snapshot and the environment.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// 1. RNG quality: `random_bytes()` uses OS entropy in production
/// 2. Minimal panics: Methods are infallible except in exceptional
///    circumstances (e.g., OS entropy exhaustion, incorrect simulation setup)
pub trait Environment: Clone + Send + Sync + 'static {
    /// Returns the current wall-clock time.
    ///
    /// Used to stamp assignments and messages. Not required to be monotonic.
    fn now(&self) -> SystemTime;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Determinism during simulations: Given the same RNG seed, this produces
    ///   the same sequence of bytes
    /// - Unpredictability in production: fresh entropy every call, never
    ///   derived from a stored seed
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Generates a uniformly distributed value in `0..bound`.
    ///
    /// Uses rejection sampling so that small bounds carry no modulo bias.
    /// A `bound` of zero yields zero.
    fn random_below(&self, bound: u64) -> u64 {
        if bound <= 1 {
            return 0;
        }

        // Largest multiple of `bound` that fits in u64; draws at or above it
        // are rejected.
        let zone = u64::MAX - (u64::MAX % bound);
        loop {
            let draw = self.random_u64();
            if draw < zone {
                return draw % bound;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    };

    use super::*;

    /// Emits a fixed sequence of u64 values, one per `random_bytes` call.
    #[derive(Clone)]
    struct ScriptedEnv {
        values: Arc<Vec<u64>>,
        cursor: Arc<AtomicU64>,
    }

    impl ScriptedEnv {
        fn new(values: Vec<u64>) -> Self {
            Self { values: Arc::new(values), cursor: Arc::new(AtomicU64::new(0)) }
        }
    }

    impl Environment for ScriptedEnv {
        fn now(&self) -> SystemTime {
            SystemTime::UNIX_EPOCH
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            let idx = self.cursor.fetch_add(1, Ordering::SeqCst) as usize;
            let value = self.values[idx % self.values.len()];
            buffer.copy_from_slice(&value.to_be_bytes()[..buffer.len()]);
        }
    }

    #[test]
    fn random_below_reduces_into_range() {
        let env = ScriptedEnv::new(vec![17]);
        assert_eq!(env.random_below(5), 2);
    }

    #[test]
    fn random_below_rejects_biased_zone() {
        // u64::MAX is inside the rejected zone for bound 3 (u64::MAX % 3 == 0,
        // so zone == u64::MAX and u64::MAX itself is rejected).
        let env = ScriptedEnv::new(vec![u64::MAX, 4]);
        assert_eq!(env.random_below(3), 1);
        assert_eq!(env.cursor.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn random_below_degenerate_bounds() {
        let env = ScriptedEnv::new(vec![99]);
        assert_eq!(env.random_below(0), 0);
        assert_eq!(env.random_below(1), 0);
        // No randomness consumed for degenerate bounds
        assert_eq!(env.cursor.load(Ordering::SeqCst), 0);
    }
}
