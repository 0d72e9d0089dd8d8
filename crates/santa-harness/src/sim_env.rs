//! Simulated environment with a seeded RNG and a virtual clock.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, SystemTime},
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use santa_core::env::Environment;

/// Start of simulated time (2024-12-01T00:00:00Z).
const SIM_EPOCH_SECS: u64 = 1_733_011_200;

/// Deterministic environment for tests.
///
/// Clones share the same RNG stream and clock, so an engine and its caller
/// observe one consistent timeline.
#[derive(Clone, Debug)]
pub struct SimEnv {
    seed: u64,
    rng: Arc<Mutex<ChaCha8Rng>>,
    clock: Arc<Mutex<SystemTime>>,
}

impl SimEnv {
    /// Create an environment from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            clock: Arc::new(Mutex::new(SystemTime::UNIX_EPOCH + Duration::from_secs(SIM_EPOCH_SECS))),
        }
    }

    /// Seed this environment was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, by: Duration) {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        *clock += by;
    }
}

impl Environment for SimEnv {
    fn now(&self) -> SystemTime {
        *self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}
