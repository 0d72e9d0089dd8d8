//! Assignment storage.
//!
//! The store holds the current epoch: one complete assignment set, or
//! nothing. Readers must never observe a partially replaced set.
//!
//! ## Invariants
//!
//! - Atomic replace: `replace_assignments` swaps the whole set in one step
//! - Consistent lookups: `gifter_assignment` and `recipient_assignment` answer
//!   from the same committed set

use std::{sync::RwLock, time::SystemTime};

use crate::{
    env::Environment,
    participant::{Assignment, UserId},
    shuffle::{self, AssignmentSet, ShuffleError},
    snapshot::Snapshot,
};

/// Errors from an assignment store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store's lock was poisoned by a panicking writer.
    #[error("assignment store lock poisoned")]
    Poisoned,

    /// The backing storage could not be reached or written.
    #[error("assignment store unavailable: {0}")]
    Unavailable(String),
}

/// Durable keyed storage of the current assignment set.
///
/// Implementations provide interior mutability; every method takes `&self`.
pub trait AssignmentStore {
    /// Whether an epoch exists (any assignment stored).
    fn has_assignments(&self) -> Result<bool, StoreError>;

    /// Every stored assignment, ordered by gifter id.
    fn assignments(&self) -> Result<Vec<Assignment>, StoreError>;

    /// Replace the entire set in one step.
    fn replace_assignments(&self, set: AssignmentSet) -> Result<(), StoreError>;

    /// Drop every stored assignment.
    fn clear_assignments(&self) -> Result<(), StoreError>;

    /// Assignment in which `user` is the gifter.
    fn gifter_assignment(&self, user: UserId) -> Result<Option<Assignment>, StoreError>;

    /// Assignment in which `user` is the recipient.
    fn recipient_assignment(&self, user: UserId) -> Result<Option<Assignment>, StoreError>;

    /// Number of stored assignments.
    fn assignment_count(&self) -> Result<usize, StoreError> {
        Ok(self.assignments()?.len())
    }
}

/// In-memory assignment store.
///
/// A single `RwLock` guards the whole set, so replacement is all-or-nothing
/// from a reader's point of view.
#[derive(Debug, Default)]
pub struct MemoryAssignmentStore {
    current: RwLock<AssignmentSet>,
}

impl MemoryAssignmentStore {
    /// Create an empty store (no epoch).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `set`.
    pub fn with_assignments(set: AssignmentSet) -> Self {
        Self { current: RwLock::new(set) }
    }

    fn read<T>(&self, f: impl FnOnce(&AssignmentSet) -> T) -> Result<T, StoreError> {
        let guard = self.current.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&guard))
    }
}

impl AssignmentStore for MemoryAssignmentStore {
    fn has_assignments(&self) -> Result<bool, StoreError> {
        self.read(|set| !set.is_empty())
    }

    fn assignments(&self) -> Result<Vec<Assignment>, StoreError> {
        self.read(|set| set.iter().copied().collect())
    }

    fn replace_assignments(&self, set: AssignmentSet) -> Result<(), StoreError> {
        let mut guard = self.current.write().map_err(|_| StoreError::Poisoned)?;
        *guard = set;
        Ok(())
    }

    fn clear_assignments(&self) -> Result<(), StoreError> {
        self.replace_assignments(AssignmentSet::default())
    }

    fn gifter_assignment(&self, user: UserId) -> Result<Option<Assignment>, StoreError> {
        self.read(|set| set.gifter_assignment(user).copied())
    }

    fn recipient_assignment(&self, user: UserId) -> Result<Option<Assignment>, StoreError> {
        self.read(|set| set.recipient_assignment(user).copied())
    }

    fn assignment_count(&self) -> Result<usize, StoreError> {
        self.read(AssignmentSet::len)
    }
}

/// Outcome of a committed shuffle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShuffleReport {
    /// Number of assignments committed
    pub assigned: usize,
    /// Timestamp stamped on the batch
    pub shuffled_at: SystemTime,
    /// Whether a previous epoch was discarded
    pub replaced_previous: bool,
}

/// Errors from [`reshuffle`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReshuffleError {
    /// The engine rejected the roster or deadlocked.
    #[error(transparent)]
    Shuffle(#[from] ShuffleError),

    /// The store failed to clear or commit.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ReshuffleError {
    /// Returns true if rerunning on unchanged data may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Shuffle(e) => e.is_retryable(),
            Self::Store(_) => false,
        }
    }

    /// The engine error, if this is one.
    pub fn as_shuffle(&self) -> Option<&ShuffleError> {
        match self {
            Self::Shuffle(e) => Some(e),
            Self::Store(_) => None,
        }
    }
}

/// Clear the current epoch, run one shuffle attempt, and commit the result.
///
/// A roster with fewer than two participants is rejected before anything is
/// cleared. Past that point an existing epoch is discarded unconditionally;
/// if the attempt then fails, the store is left with no assignments.
///
/// Callers must serialize invocations: two concurrent reshuffles against the
/// same store can interleave their clear and commit steps.
pub fn reshuffle<S, E>(
    store: &S,
    snapshot: &Snapshot,
    env: &E,
) -> Result<ShuffleReport, ReshuffleError>
where
    S: AssignmentStore + ?Sized,
    E: Environment,
{
    let count = snapshot.len();
    if count < 2 {
        return Err(ShuffleError::NotEnoughParticipants { count }.into());
    }

    let replaced_previous = store.has_assignments()?;
    if replaced_previous {
        tracing::info!("discarding previous assignment set");
        store.clear_assignments()?;
    }

    let set = shuffle::shuffle(snapshot, env)?;
    let assigned = set.len();
    let shuffled_at = set.iter().next().map_or_else(|| env.now(), |a| a.created_at);

    store.replace_assignments(set)?;
    tracing::info!(assigned, "assignment set committed");

    Ok(ShuffleReport { assigned, shuffled_at, replaced_previous })
}
