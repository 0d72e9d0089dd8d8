//! Deterministic simulation harness for the Secret Santa core.
//!
//! Seeded implementation of the `Environment` trait plus an invariant oracle,
//! so any failing shuffle can be replayed from its seed.
//!
//! # Oracle Checks
//!
//! The `oracle` module states the assignment invariants independently of the
//! engine. Property tests and fuzz targets run the engine and hand every
//! committed set to the oracle.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod oracle;
pub mod scenario;
pub mod sim_env;

pub use oracle::{InvariantViolation, verify_assignment_invariants};
pub use scenario::{RosterScenario, ScenarioOutcome};
pub use sim_env::SimEnv;
