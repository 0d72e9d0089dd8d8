//! Generated roster scenarios.
//!
//! A `RosterScenario` is a compact description of a roster and its
//! exclusions. It derives `Arbitrary` so fuzz targets can build one from raw
//! bytes, and property tests can build one from proptest values.

use arbitrary::Arbitrary;
use santa_core::{
    AssignmentStore, Exclusion, MemoryAssignmentStore, ReshuffleError, ShuffleError, Snapshot,
    UserId, reshuffle,
};

use crate::{
    oracle::{InvariantViolation, verify_assignment_invariants},
    sim_env::SimEnv,
};

/// Largest roster a scenario expands to.
pub const MAX_PARTICIPANTS: u8 = 24;

/// Roster size plus exclusion pairs over small participant indices.
#[derive(Debug, Clone, Arbitrary)]
pub struct RosterScenario {
    /// Roster size hint, reduced modulo `MAX_PARTICIPANTS + 1`.
    pub participants: u8,
    /// `(user, excluded)` index pairs. Indices past the roster name outsiders.
    pub exclusions: Vec<(u8, u8)>,
}

/// What happened when a scenario ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioOutcome {
    /// A set was committed and passed the oracle.
    Committed {
        /// Attempts used, including the successful one
        attempts: u32,
    },
    /// The engine rejected the roster on every attempt.
    Rejected(ShuffleError),
    /// A committed set broke an invariant.
    Violation(InvariantViolation),
    /// The store failed.
    StoreFailure(String),
}

impl RosterScenario {
    /// Participant ids start at 1000 so they never collide with indices.
    fn user(index: u8) -> UserId {
        1000 + UserId::from(index)
    }

    /// Number of participants after clamping.
    pub fn roster_size(&self) -> u8 {
        self.participants % (MAX_PARTICIPANTS + 1)
    }

    /// Expand into a core snapshot.
    pub fn to_snapshot(&self) -> Snapshot {
        let roster = (0..self.roster_size()).map(Self::user);
        let exclusions =
            self.exclusions.iter().map(|&(u, x)| Exclusion::new(Self::user(u), Self::user(x)));
        Snapshot::capture(roster, exclusions)
    }

    /// Reshuffle against a fresh store, retrying deadlocks up to
    /// `max_attempts` times, and check whatever gets committed.
    pub fn run(&self, seed: u64, max_attempts: u32) -> ScenarioOutcome {
        let env = SimEnv::with_seed(seed);
        let store = MemoryAssignmentStore::new();
        let snapshot = self.to_snapshot();

        let mut attempts = 0;
        loop {
            attempts += 1;
            match reshuffle(&store, &snapshot, &env) {
                Ok(_) => break,
                Err(ReshuffleError::Shuffle(e)) if e.is_retryable() && attempts < max_attempts => {},
                Err(ReshuffleError::Shuffle(e)) => return ScenarioOutcome::Rejected(e),
                Err(ReshuffleError::Store(e)) => return ScenarioOutcome::StoreFailure(e.to_string()),
            }
        }

        let committed = match store.assignments() {
            Ok(list) => list,
            Err(e) => return ScenarioOutcome::StoreFailure(e.to_string()),
        };
        match verify_assignment_invariants(&snapshot, &committed) {
            Ok(()) => ScenarioOutcome::Committed { attempts },
            Err(v) => ScenarioOutcome::Violation(v),
        }
    }
}
