//! Property tests for the shuffle engine.
//!
//! Every committed assignment set, for any roster and any exclusion list, must
//! pass the oracle. Rejections must match the documented taxonomy.

use proptest::prelude::*;
use santa_core::{
    AssignmentStore, Exclusion, MemoryAssignmentStore, ShuffleError, Snapshot, UserId, reshuffle,
    shuffle,
};
use santa_harness::{RosterScenario, ScenarioOutcome, SimEnv, verify_assignment_invariants};

fn scenario_strategy() -> impl Strategy<Value = RosterScenario> {
    (0u8..=16, prop::collection::vec((0u8..20, 0u8..20), 0..40))
        .prop_map(|(participants, exclusions)| RosterScenario { participants, exclusions })
}

proptest! {
    /// No committed set ever breaks an invariant.
    #[test]
    fn prop_committed_sets_pass_oracle(seed in any::<u64>(), scenario in scenario_strategy()) {
        let outcome = scenario.run(seed, 8);
        prop_assert!(
            !matches!(outcome, ScenarioOutcome::Violation(_) | ScenarioOutcome::StoreFailure(_)),
            "seed {} scenario {:?} produced {:?}", seed, scenario, outcome
        );
    }

    /// Rosters below two are always rejected as too small.
    #[test]
    fn prop_tiny_rosters_rejected(seed in any::<u64>(), size in 0u8..2) {
        let scenario = RosterScenario { participants: size, exclusions: Vec::new() };
        prop_assert_eq!(
            scenario.run(seed, 1),
            ScenarioOutcome::Rejected(ShuffleError::NotEnoughParticipants { count: usize::from(size) })
        );
    }

    /// With no exclusions and at least two people, retrying always gets there.
    #[test]
    fn prop_unrestricted_rosters_commit(seed in any::<u64>(), size in 2u8..=16) {
        let scenario = RosterScenario { participants: size, exclusions: Vec::new() };
        let outcome = scenario.run(seed, 200);
        prop_assert!(matches!(outcome, ScenarioOutcome::Committed { .. }), "got {:?}", outcome);
    }

    /// Same seed, same snapshot, same result.
    #[test]
    fn prop_shuffle_deterministic_under_seed(seed in any::<u64>(), scenario in scenario_strategy()) {
        let snapshot = scenario.to_snapshot();
        let first = shuffle(&snapshot, &SimEnv::with_seed(seed));
        let second = shuffle(&snapshot, &SimEnv::with_seed(seed));
        prop_assert_eq!(first, second);
    }

    /// Gifter and recipient lookups agree on every committed pair.
    #[test]
    fn prop_lookups_round_trip(seed in any::<u64>(), size in 2u8..=12) {
        let env = SimEnv::with_seed(seed);
        let store = MemoryAssignmentStore::new();
        let snapshot = Snapshot::capture((1..=UserId::from(size)).collect::<Vec<_>>(), []);

        let mut committed = false;
        for _ in 0..200 {
            if reshuffle(&store, &snapshot, &env).is_ok() {
                committed = true;
                break;
            }
        }
        prop_assert!(committed);

        for &user in snapshot.roster() {
            let Some(given) = store.gifter_assignment(user).ok().flatten() else {
                return Err(TestCaseError::fail(format!("{user} has no recipient")));
            };
            let back = store.recipient_assignment(given.recipient).ok().flatten();
            prop_assert_eq!(back.map(|a| a.gifter), Some(user));
        }
    }
}

const A: UserId = 1;
const B: UserId = 2;
const C: UserId = 3;
const D: UserId = 4;

#[test]
fn infeasible_pair_names_gifter_and_commits_nothing() {
    let env = SimEnv::with_seed(11);
    let store = MemoryAssignmentStore::new();
    let snapshot = Snapshot::capture([A, B], [Exclusion::new(A, B)]);

    let err = reshuffle(&store, &snapshot, &env).expect_err("A has nobody to gift");
    assert_eq!(err.as_shuffle(), Some(&ShuffleError::InfeasibleParticipant(A)));
    assert_eq!(store.has_assignments(), Ok(false));
}

#[test]
fn competing_gifters_deadlock_under_some_seed() {
    // A and D both refuse B and C, so they can only gift each other.
    let snapshot = Snapshot::capture(
        [A, B, C, D],
        [Exclusion::new(A, B), Exclusion::new(A, C), Exclusion::new(D, B), Exclusion::new(D, C)],
    );

    let mut deadlocks = 0;
    for seed in 0..200 {
        match shuffle(&snapshot, &SimEnv::with_seed(seed)) {
            Ok(set) => {
                let committed: Vec<_> = set.iter().copied().collect();
                assert_eq!(verify_assignment_invariants(&snapshot, &committed), Ok(()));
            },
            Err(ShuffleError::AssignmentDeadlock { .. }) => deadlocks += 1,
            Err(e) => panic!("seed {seed}: unexpected {e}"),
        }
    }
    assert!(deadlocks > 0, "greedy walk must strand a gifter for some seeds");
}

#[test]
fn exclusion_does_not_bind_the_excluded() {
    // A refuses B; B is still free to gift A.
    let snapshot = Snapshot::capture([A, B, C], [Exclusion::new(A, B)]);
    let hit = (0..200).any(|seed| {
        shuffle(&snapshot, &SimEnv::with_seed(seed))
            .ok()
            .and_then(|set| set.gifter_assignment(B).map(|a| a.recipient))
            == Some(A)
    });
    assert!(hit);
}

#[test]
fn reshuffle_leaves_no_residue() {
    let env = SimEnv::with_seed(5);
    let store = MemoryAssignmentStore::new();
    let first = Snapshot::capture([A, B, C, D], []);
    while reshuffle(&store, &first, &env).is_err() {}

    // Shrink the roster; nothing from the first epoch may survive.
    let second = Snapshot::capture([A, B], []);
    reshuffle(&store, &second, &env).expect("a pair always commits");

    let committed = store.assignments().expect("readable");
    assert_eq!(verify_assignment_invariants(&second, &committed), Ok(()));
    assert_eq!(store.gifter_assignment(C), Ok(None));
    assert_eq!(store.recipient_assignment(D), Ok(None));
}
