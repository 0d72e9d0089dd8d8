//! Persisted application state.
//!
//! The whole deployment fits in one CBOR document: participants,
//! exclusions, the committed assignment set, and the message log.
//!
//! ## Atomicity
//!
//! `save` writes to a sibling temp file and renames it over the target, so a
//! crash mid-write leaves the previous snapshot intact.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use santa_core::{Assignment, Exclusion, Participant};
use serde::{Deserialize, Serialize};

use crate::relay::AnonymousMessage;

/// Snapshot format version.
pub const STATE_VERSION: u32 = 1;

/// Errors from snapshot encoding and file access.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Reading or writing the snapshot file failed
    #[error("state file {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// CBOR encoding failed
    #[error("failed to encode state: {0}")]
    Encode(String),

    /// CBOR decoding failed
    #[error("failed to decode state: {0}")]
    Decode(String),

    /// Snapshot was written by an incompatible version
    #[error("unsupported state version {found}, expected {STATE_VERSION}")]
    Version {
        /// Version found in the file
        found: u32,
    },

    /// Snapshot content violates an invariant
    #[error("corrupt state: {0}")]
    Corrupt(String),
}

/// Everything the coordinator needs to resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Format version
    pub version: u32,
    /// Registered participants
    pub participants: Vec<Participant>,
    /// Exclusion pairs
    pub exclusions: Vec<Exclusion>,
    /// Committed assignment set (empty before the shuffle)
    pub assignments: Vec<Assignment>,
    /// Relayed messages
    pub messages: Vec<AnonymousMessage>,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            participants: Vec::new(),
            exclusions: Vec::new(),
            assignments: Vec::new(),
            messages: Vec::new(),
        }
    }
}

impl StateSnapshot {
    /// Encode as CBOR.
    pub fn encode(&self) -> Result<Vec<u8>, StateError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| StateError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decode from CBOR, rejecting other format versions.
    pub fn decode(bytes: &[u8]) -> Result<Self, StateError> {
        let state: Self =
            ciborium::from_reader(bytes).map_err(|e| StateError::Decode(e.to_string()))?;
        if state.version != STATE_VERSION {
            return Err(StateError::Version { found: state.version });
        }
        Ok(state)
    }

    /// Write to `path` via temp file and rename.
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        let bytes = self.encode()?;
        let tmp = path.with_extension("tmp");
        let io_err = |source| StateError::Io { path: tmp.clone(), source };

        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&tmp, path).map_err(|source| StateError::Io { path: path.to_path_buf(), source })?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "state saved");
        Ok(())
    }

    /// Load from `path`. Returns `None` if the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, StateError> {
        match fs::read(path) {
            Ok(bytes) => Self::decode(&bytes).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StateError::Io { path: path.to_path_buf(), source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    fn sample() -> StateSnapshot {
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let mut alice = Participant::new(1, at);
        alice.username = Some("alice".to_string());
        alice.wishes = Some("a warm scarf".to_string());

        StateSnapshot {
            participants: vec![alice, Participant::new(2, at)],
            exclusions: vec![Exclusion::new(1, 2)],
            assignments: Vec::new(),
            messages: vec![AnonymousMessage {
                from: 1,
                to: 2,
                text: "hello".to_string(),
                sent_at: at,
                from_gifter: false,
            }],
            ..StateSnapshot::default()
        }
    }

    #[test]
    fn save_then_load_restores_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("santa.cbor");

        let state = sample();
        state.save(&path).expect("save");
        assert_eq!(StateSnapshot::load(&path).expect("load"), Some(state));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(StateSnapshot::load(&dir.path().join("absent.cbor")).expect("load"), None);
    }

    #[test]
    fn garbage_is_rejected() {
        let err = StateSnapshot::decode(&[0xff, 0x00, 0x13]).expect_err("not CBOR");
        assert!(matches!(err, StateError::Decode(_)));
    }

    #[test]
    fn future_version_is_rejected() {
        let state = StateSnapshot { version: STATE_VERSION + 1, ..sample() };
        let bytes = state.encode().expect("encode");
        let err = StateSnapshot::decode(&bytes).expect_err("wrong version");
        assert!(matches!(err, StateError::Version { found } if found == STATE_VERSION + 1));
    }
}
