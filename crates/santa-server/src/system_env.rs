//! Production Environment implementation using system time and RNG.
//!
//! This module provides `SystemEnv`, the production implementation of the
//! `Environment` trait that uses the real system clock and OS randomness.

use std::time::SystemTime;

use santa_core::env::Environment;

/// Production environment using system time and OS randomness.
///
/// This implementation:
/// - Uses `SystemTime::now()` for timestamps
/// - Uses `getrandom` for randomness, so every shuffle draws a fresh,
///   non-reproducible order
#[derive(Clone, Debug, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).unwrap_or_else(|e| {
            // NOTE: This should never fail on supported platforms. Fall back to
            // a clock-derived fill so the shuffle still varies between runs.
            tracing::error!("getrandom failed: {}", e);
            let nanos = SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map_or(0, |d| d.as_nanos());
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = (nanos >> ((i % 16) * 8)) as u8;
            }
        });
    }
}
