//! Console server tests

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::SystemTime,
};

use santa_core::{AssignmentStore, Environment};
use santa_server::{AdminList, Server, ServerConfig, StateSnapshot, SystemEnv};

// Repeats one random draw, switchable between commands. Over the roster
// {1, 2, 3} a draw of 0 always commits and a draw of 2 always strands
// gifter 3.
#[derive(Clone, Default)]
struct ScriptedEnv {
    draw: Arc<AtomicU64>,
}

impl ScriptedEnv {
    fn constant(draw: u64) -> Self {
        let env = Self::default();
        env.set_draw(draw);
        env
    }

    fn set_draw(&self, draw: u64) {
        self.draw.store(draw, Ordering::SeqCst);
    }
}

impl Environment for ScriptedEnv {
    fn now(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        let draw = self.draw.load(Ordering::SeqCst);
        for (dst, src) in buffer.iter_mut().zip(draw.to_be_bytes()) {
            *dst = src;
        }
    }
}

fn config(state: Option<std::path::PathBuf>) -> ServerConfig {
    ServerConfig { admins: AdminList::new([1]), shuffle_attempts: 64, state_path: state }
}

const SESSION: &str = "\
1 /register @alice Alice
2 /register @bob Bob
3 /register @carol
2 /updatewishes a kite

1 /shuffle
";

#[tokio::test]
async fn console_session_produces_replies() {
    let server = Server::open(config(None), SystemEnv::new()).unwrap();
    let mut output = Vec::new();
    server.run(SESSION.as_bytes(), &mut output).await.unwrap();

    let text = String::from_utf8(output).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert!(lines[0].starts_with("-> 1: You are registered"));
    assert!(lines.iter().any(|l| l.starts_with("-> 2: Saved your wishes")));
    assert!(lines.last().unwrap().starts_with("-> 1: Shuffle complete: 3 assignments"));
}

#[tokio::test]
async fn refusals_and_parse_errors_are_reported() {
    let server = Server::open(config(None), SystemEnv::new()).unwrap();

    let out = server.handle_line("2 /shuffle").await.unwrap();
    assert_eq!(out, vec!["-> 2: user 2 is not an admin".to_string()]);

    let out = server.handle_line("nobody /help").await.unwrap();
    assert_eq!(out, vec!["error: invalid user id: nobody".to_string()]);

    assert!(server.handle_line("   ").await.unwrap().is_empty());
}

#[tokio::test]
async fn state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("santa.cbor");

    {
        let server = Server::open(config(Some(path.clone())), SystemEnv::new()).unwrap();
        server.run(SESSION.as_bytes(), tokio::io::sink()).await.unwrap();
    }

    let saved = StateSnapshot::load(&path).unwrap().unwrap();
    assert_eq!(saved.participants.len(), 3);
    assert_eq!(saved.assignments.len(), 3);

    let server = Server::open(config(Some(path)), SystemEnv::new()).unwrap();
    let coordinator = server.coordinator();
    let coordinator = coordinator.lock().await;
    assert_eq!(coordinator.registry().len(), 3);
    assert_eq!(coordinator.store().assignment_count().unwrap(), 3);
}

#[test]
fn zero_shuffle_attempts_is_a_config_error() {
    let config = ServerConfig { shuffle_attempts: 0, ..config(None) };
    assert!(Server::open(config, SystemEnv::new()).is_err());
}

#[tokio::test]
async fn failed_reshuffle_discards_epoch_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("santa.cbor");
    let settings = || ServerConfig { shuffle_attempts: 1, ..config(Some(path.clone())) };

    let env = ScriptedEnv::constant(0);
    let server = Server::open(settings(), env.clone()).unwrap();
    for line in ["1 /register @alice", "2 /register @bob", "3 /register @carol", "1 /shuffle"] {
        server.handle_line(line).await.unwrap();
    }
    assert_eq!(StateSnapshot::load(&path).unwrap().unwrap().assignments.len(), 3);

    env.set_draw(2);
    let out = server.handle_line("1 /shuffle").await.unwrap();
    assert!(out[0].contains("assignment deadlock"), "{out:?}");

    let in_memory = server.coordinator().lock().await.store().assignment_count().unwrap();
    let on_disk = StateSnapshot::load(&path).unwrap().unwrap().assignments.len();
    assert_eq!(in_memory, 0);
    assert_eq!(on_disk, 0);

    drop(server);
    let restarted = Server::open(settings(), ScriptedEnv::constant(0)).unwrap();
    let after = restarted.coordinator().lock().await.store().assignment_count().unwrap();
    assert_eq!(after, in_memory);

    let out = restarted.handle_line("4 /register @dave").await.unwrap();
    assert!(out[0].starts_with("-> 4: You are registered"));
}

#[tokio::test]
async fn refused_command_without_epoch_change_leaves_file_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("santa.cbor");
    let server = Server::open(config(Some(path.clone())), SystemEnv::new()).unwrap();

    server.handle_line("2 /shuffle").await.unwrap();
    assert!(StateSnapshot::load(&path).unwrap().is_none());
}
