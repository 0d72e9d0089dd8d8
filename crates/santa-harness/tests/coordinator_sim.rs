//! Seeded end-to-end runs through the coordinator.
//!
//! Drives registration, exclusions and the admin shuffle with `SimEnv`, then
//! checks the committed set with the oracle. Same seed, same assignments.

use proptest::prelude::*;
use santa_core::{Assignment, AssignmentStore, UserId};
use santa_harness::{SimEnv, verify_assignment_invariants};
use santa_server::{AdminList, Command, Coordinator, Registration, ServerConfig};

const ADMIN: UserId = 1;

fn build(seed: u64, size: u64, exclusions: &[(u64, u64)]) -> Coordinator<SimEnv> {
    let config =
        ServerConfig { admins: AdminList::new([ADMIN]), shuffle_attempts: 32, state_path: None };
    let mut coordinator = Coordinator::new(&config, SimEnv::with_seed(seed));

    for id in 1..=size {
        let registration =
            Registration { username: Some(format!("user{id}")), ..Registration::default() };
        coordinator.handle(id, Command::Register(registration)).unwrap();
    }
    for &(user, target) in exclusions {
        let user = user % size + 1;
        let target = target % size + 1;
        // Self and duplicate exclusions are refused; the roster just skips them.
        let _ = coordinator.handle(user, Command::Exclude { username: format!("user{target}") });
    }
    coordinator
}

fn committed(coordinator: &Coordinator<SimEnv>) -> Vec<Assignment> {
    coordinator.store().assignments().unwrap()
}

proptest! {
    #[test]
    fn prop_coordinator_commits_only_valid_sets(
        seed in any::<u64>(),
        size in 2u64..12,
        exclusions in prop::collection::vec((0u64..12, 0u64..12), 0..10),
    ) {
        let mut coordinator = build(seed, size, &exclusions);
        let snapshot = coordinator.registry().snapshot();

        match coordinator.handle(ADMIN, Command::Shuffle) {
            Ok(_) => {
                let assignments = committed(&coordinator);
                prop_assert_eq!(assignments.len() as u64, size);
                prop_assert!(verify_assignment_invariants(&snapshot, &assignments).is_ok());
            },
            Err(_) => prop_assert!(!coordinator.store().has_assignments().unwrap()),
        }
    }

    #[test]
    fn prop_same_seed_same_assignments(seed in any::<u64>(), size in 2u64..10) {
        let mut a = build(seed, size, &[]);
        let mut b = build(seed, size, &[]);
        let ra = a.handle(ADMIN, Command::Shuffle);
        let rb = b.handle(ADMIN, Command::Shuffle);
        prop_assert_eq!(ra.is_ok(), rb.is_ok());

        let pairs = |c: &Coordinator<SimEnv>| {
            committed(c).iter().map(|x| (x.gifter, x.recipient)).collect::<Vec<_>>()
        };
        prop_assert_eq!(pairs(&a), pairs(&b));
    }
}

#[test]
fn reshuffle_after_restart_keeps_oracle_happy() {
    let mut coordinator = build(7, 6, &[(0, 1), (2, 3), (4, 5)]);
    coordinator.handle(ADMIN, Command::Shuffle).unwrap();

    let state = coordinator.export_state().unwrap();
    let config =
        ServerConfig { admins: AdminList::new([ADMIN]), shuffle_attempts: 32, state_path: None };
    let mut resumed = Coordinator::from_state(&config, SimEnv::with_seed(8), state).unwrap();

    resumed.handle(ADMIN, Command::Shuffle).unwrap();
    let snapshot = resumed.registry().snapshot();
    assert!(verify_assignment_invariants(&snapshot, &committed(&resumed)).is_ok());
}
