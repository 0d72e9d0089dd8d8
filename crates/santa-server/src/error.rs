//! Server error types.

use santa_core::{ReshuffleError, ShuffleError, StoreError, UserId};

use crate::{registry::RegistryError, relay::RelayError, state::StateError};

/// Errors that can occur in the server process.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Console or file I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// State snapshot could not be loaded or saved
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Reasons a command was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Registry rejected the change
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Registration attempted after the shuffle
    #[error("registration is closed: the shuffle has already happened")]
    RegistrationClosed,

    /// Profile or exclusion change attempted after the shuffle
    #[error("changes are locked: the shuffle has already happened")]
    EpochLocked,

    /// Command needs a committed shuffle
    #[error("no shuffle has been performed yet")]
    NoShuffleYet,

    /// Admin command from a non-admin
    #[error("user {0} is not an admin")]
    NotAdmin(UserId),

    /// Blank anonymous message
    #[error("message text must not be empty")]
    EmptyMessage,

    /// Sender or counterpart missing from the committed set
    #[error("no assignment found for user {0}")]
    AssignmentMissing(UserId),

    /// Shuffle engine rejected the roster or deadlocked on every attempt
    #[error("shuffle failed: {0}")]
    Shuffle(ShuffleError),

    /// Assignment store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CommandError {
    /// Returns true if the user caused this error (a rejection to report
    /// back), false if the server failed.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

impl From<RelayError> for CommandError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::NoShuffleYet => Self::NoShuffleYet,
            RelayError::AssignmentMissing(user) => Self::AssignmentMissing(user),
            RelayError::Store(e) => Self::Store(e),
        }
    }
}

impl From<ReshuffleError> for CommandError {
    fn from(err: ReshuffleError) -> Self {
        match err {
            ReshuffleError::Shuffle(e) => Self::Shuffle(e),
            ReshuffleError::Store(e) => Self::Store(e),
        }
    }
}
