//! Shuffle Engine
//!
//! Randomized greedy assignment over a roster snapshot.
//!
//! ## Algorithm
//!
//! 1. Reject rosters with fewer than two participants
//! 2. Run the feasibility pre-check
//! 3. Visit gifters in a fresh uniformly random order (Fisher-Yates)
//! 4. For each gifter, pick a uniformly random recipient among those still
//!    available, not the gifter, and not excluded by the gifter
//! 5. If a gifter has no candidate left, abort the whole attempt
//!
//! There is no backtracking. A stranded gifter fails the attempt with
//! [`ShuffleError::AssignmentDeadlock`]; the caller decides whether to retry.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    env::Environment,
    feasibility::{self, InfeasibleParticipant},
    participant::{Assignment, UserId},
    snapshot::Snapshot,
};

/// Errors from a shuffle attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ShuffleError {
    /// Fewer than two participants.
    #[error("not enough participants: need at least 2, have {count}")]
    NotEnoughParticipants {
        /// Roster size
        count: usize,
    },

    /// A participant has no eligible recipient under the exclusion graph.
    #[error("participant {0} has no eligible recipient")]
    InfeasibleParticipant(UserId),

    /// The greedy walk stranded a gifter with no remaining candidate.
    #[error("assignment deadlock: no recipient left for gifter {gifter}")]
    AssignmentDeadlock {
        /// Gifter left without a recipient
        gifter: UserId,
    },
}

impl ShuffleError {
    /// Returns true if retrying on unchanged data may succeed.
    ///
    /// Only deadlock depends on the random order; the other failures are
    /// deterministic for a given roster and exclusion set.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AssignmentDeadlock { .. } => true,
            Self::NotEnoughParticipants { .. } | Self::InfeasibleParticipant(_) => false,
        }
    }
}

impl From<InfeasibleParticipant> for ShuffleError {
    fn from(err: InfeasibleParticipant) -> Self {
        Self::InfeasibleParticipant(err.0)
    }
}

/// A complete, validated assignment batch.
///
/// Keeps forward and reverse indices built together so both per-user
/// lookups always answer from the same batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentSet {
    by_gifter: BTreeMap<UserId, Assignment>,
    gifter_of: BTreeMap<UserId, UserId>,
}

impl AssignmentSet {
    /// Rebuild a set from stored assignments.
    ///
    /// Returns `None` if any gifter or recipient appears twice, since such a
    /// list cannot be one batch.
    pub fn from_assignments<I>(assignments: I) -> Option<Self>
    where
        I: IntoIterator<Item = Assignment>,
    {
        let mut set = Self::default();
        for assignment in assignments {
            if !set.insert(assignment) {
                return None;
            }
        }
        Some(set)
    }

    fn insert(&mut self, assignment: Assignment) -> bool {
        if self.by_gifter.contains_key(&assignment.gifter)
            || self.gifter_of.contains_key(&assignment.recipient)
        {
            return false;
        }
        self.gifter_of.insert(assignment.recipient, assignment.gifter);
        self.by_gifter.insert(assignment.gifter, assignment);
        true
    }

    /// Assignment in which `user` is the gifter.
    pub fn gifter_assignment(&self, user: UserId) -> Option<&Assignment> {
        self.by_gifter.get(&user)
    }

    /// Assignment in which `user` is the recipient.
    pub fn recipient_assignment(&self, user: UserId) -> Option<&Assignment> {
        self.gifter_of.get(&user).and_then(|gifter| self.by_gifter.get(gifter))
    }

    /// All assignments, ordered by gifter id.
    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.by_gifter.values()
    }

    /// Number of assignments.
    pub fn len(&self) -> usize {
        self.by_gifter.len()
    }

    /// True if the set holds no assignments.
    pub fn is_empty(&self) -> bool {
        self.by_gifter.is_empty()
    }
}

/// Run one shuffle attempt over `snapshot`.
///
/// Every random decision is drawn from `env`, and every assignment is
/// stamped with a single `env.now()` reading.
///
/// # Errors
///
/// - `ShuffleError::NotEnoughParticipants` if the roster has fewer than two
///   participants.
/// - `ShuffleError::InfeasibleParticipant` if the pre-check fails.
/// - `ShuffleError::AssignmentDeadlock` if the greedy walk strands a gifter.
pub fn shuffle<E: Environment>(snapshot: &Snapshot, env: &E) -> Result<AssignmentSet, ShuffleError> {
    let count = snapshot.len();
    if count < 2 {
        return Err(ShuffleError::NotEnoughParticipants { count });
    }

    feasibility::check(snapshot)?;

    let created_at = env.now();
    let order = random_order(snapshot.roster(), env);
    let mut available: BTreeSet<UserId> = snapshot.roster().clone();
    let mut set = AssignmentSet::default();

    for gifter in order {
        let candidates: Vec<UserId> =
            available.iter().copied().filter(|&r| snapshot.permits(gifter, r)).collect();

        if candidates.is_empty() {
            tracing::warn!(gifter, assigned = set.len(), "shuffle deadlocked");
            return Err(ShuffleError::AssignmentDeadlock { gifter });
        }

        let recipient = candidates[pick(candidates.len(), env)];
        available.remove(&recipient);
        set.insert(Assignment { gifter, recipient, created_at });
    }

    tracing::debug!(assigned = set.len(), "shuffle attempt complete");
    Ok(set)
}

/// Uniform random permutation of the roster.
fn random_order<E: Environment>(roster: &BTreeSet<UserId>, env: &E) -> Vec<UserId> {
    let mut order: Vec<UserId> = roster.iter().copied().collect();
    for i in (1..order.len()).rev() {
        let j = pick(i + 1, env);
        order.swap(i, j);
    }
    order
}

fn pick<E: Environment>(len: usize, env: &E) -> usize {
    // len fits in u64 on every supported target, and the result is < len
    env.random_below(len as u64) as usize
}
