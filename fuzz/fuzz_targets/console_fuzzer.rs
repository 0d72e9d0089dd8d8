//! Fuzz target for console commands driving the coordinator
//!
//! # Strategy
//!
//! - Lines: arbitrary text, most of it unparseable
//! - Structured commands: register, exclude, shuffle and message from a
//!   handful of users so the interesting paths are reached
//!
//! # Invariants
//!
//! - Parsing NEVER panics
//! - After every successful shuffle the committed set passes the oracle
//! - Registration and exclusion edits never succeed once a set is committed

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use santa_core::AssignmentStore;
use santa_harness::{SimEnv, verify_assignment_invariants};
use santa_server::{AdminList, Command, Coordinator, ServerConfig, console};

#[derive(Debug, Arbitrary)]
enum Step {
    Raw(String),
    Register { user: u8 },
    Exclude { user: u8, target: u8 },
    Shuffle,
    Message { user: u8, to_gifter: bool, text: String },
}

impl Step {
    fn line(&self) -> String {
        match self {
            Self::Raw(line) => line.clone(),
            Self::Register { user } => format!("{} /register @u{}", user % 8, user % 8),
            Self::Exclude { user, target } => {
                format!("{} /blacklist add @u{}", user % 8, target % 8)
            },
            Self::Shuffle => "0 /shuffle".to_string(),
            Self::Message { user, to_gifter, text } => {
                let target = if *to_gifter { "sender" } else { "recipient" };
                format!("{} /message {target} {text}", user % 8)
            },
        }
    }
}

fuzz_target!(|input: (u64, Vec<Step>)| {
    let (seed, steps) = input;
    let config = ServerConfig { admins: AdminList::new([0]), shuffle_attempts: 4, state_path: None };
    let mut coordinator = Coordinator::new(&config, SimEnv::with_seed(seed));

    for step in steps.iter().take(64) {
        let Ok((sender, command)) = console::parse_line(&step.line()) else {
            continue;
        };
        let locked = coordinator.store().has_assignments().unwrap_or(false);
        let editing = matches!(command, Command::Register(_) | Command::Exclude { .. });
        let is_shuffle = command == Command::Shuffle;

        let result = coordinator.handle(sender, command);
        if locked && editing {
            assert!(result.is_err(), "edit accepted after shuffle");
        }
        if is_shuffle && result.is_ok() {
            let snapshot = coordinator.registry().snapshot();
            let assignments = coordinator.store().assignments().unwrap_or_default();
            if let Err(v) = verify_assignment_invariants(&snapshot, &assignments) {
                panic!("seed {seed}: {v:?}");
            }
        }
    }
});
