//! Fuzz target for the shuffle engine
//!
//! # Strategy
//!
//! - Rosters: 0 to 24 participants from a size hint
//! - Exclusions: arbitrary index pairs, including self pairs, duplicates and
//!   outsiders
//! - Retries: a small deadlock retry budget, as the coordinator uses
//!
//! # Invariants
//!
//! - Every committed set passes the oracle
//! - Rosters below two are rejected as too small, and only those
//! - The memory store never fails
//! - NEVER panic on any roster

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use santa_core::ShuffleError;
use santa_harness::{RosterScenario, ScenarioOutcome};

#[derive(Debug, Arbitrary)]
struct ShuffleInput {
    seed: u64,
    attempts: u8,
    scenario: RosterScenario,
}

fuzz_target!(|input: ShuffleInput| {
    let attempts = u32::from(input.attempts % 8) + 1;
    let size = usize::from(input.scenario.roster_size());

    match input.scenario.run(input.seed, attempts) {
        ScenarioOutcome::Committed { attempts: used } => {
            assert!(size >= 2, "committed a roster of {size}");
            assert!(used <= attempts);
        },
        ScenarioOutcome::Rejected(ShuffleError::NotEnoughParticipants { count }) => {
            assert_eq!(count, size);
            assert!(size < 2);
        },
        ScenarioOutcome::Rejected(_) => assert!(size >= 2),
        ScenarioOutcome::Violation(v) => panic!("seed {}: {v:?}", input.seed),
        ScenarioOutcome::StoreFailure(e) => panic!("memory store failed: {e}"),
    }
});
