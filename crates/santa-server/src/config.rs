//! Server configuration.

use std::{collections::BTreeSet, path::PathBuf};

use santa_core::UserId;

use crate::error::ServerError;

/// Static admin allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminList {
    ids: BTreeSet<UserId>,
}

impl AdminList {
    /// Build from a list of admin ids.
    pub fn new(ids: impl IntoIterator<Item = UserId>) -> Self {
        Self { ids: ids.into_iter().collect() }
    }

    /// Whether `user` may run admin commands.
    pub fn is_admin(&self, user: UserId) -> bool {
        self.ids.contains(&user)
    }

    /// Number of admins.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True if nobody is an admin.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Coordinator and driver configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Users allowed to run admin commands
    pub admins: AdminList,
    /// Attempts per `Shuffle` command; only deadlocks are retried
    pub shuffle_attempts: u32,
    /// CBOR state file, loaded at start and saved after each change
    pub state_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { admins: AdminList::default(), shuffle_attempts: 1, state_path: None }
    }
}

impl ServerConfig {
    /// Check values that clap cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` naming the first invalid setting.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.shuffle_attempts == 0 {
            return Err(ServerError::Config("shuffle_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}
