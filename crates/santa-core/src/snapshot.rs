//! Immutable shuffle input.
//!
//! The caller captures the roster and exclusions once; the feasibility
//! checker and the engine only ever borrow this snapshot, never live storage.

use std::collections::BTreeSet;

use crate::{
    exclusion::ExclusionIndex,
    participant::{Exclusion, UserId},
};

/// Roster plus exclusion index, frozen at capture time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    roster: BTreeSet<UserId>,
    exclusions: ExclusionIndex,
}

impl Snapshot {
    /// Capture a roster and its exclusion pairs.
    ///
    /// Duplicate roster entries collapse. Exclusions naming users outside the
    /// roster are kept in the index but never matter, since candidates are
    /// always drawn from the roster.
    pub fn capture<R, X>(roster: R, exclusions: X) -> Self
    where
        R: IntoIterator<Item = UserId>,
        X: IntoIterator<Item = Exclusion>,
    {
        Self { roster: roster.into_iter().collect(), exclusions: ExclusionIndex::build(exclusions) }
    }

    /// Participants, in ascending id order.
    pub fn roster(&self) -> &BTreeSet<UserId> {
        &self.roster
    }

    /// Exclusion index.
    pub fn exclusions(&self) -> &ExclusionIndex {
        &self.exclusions
    }

    /// Number of participants.
    pub fn len(&self) -> usize {
        self.roster.len()
    }

    /// True if the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    /// Whether `gifter` may be assigned `recipient`: different people, and
    /// `recipient` is not in `gifter`'s exclusions.
    pub fn permits(&self, gifter: UserId, recipient: UserId) -> bool {
        gifter != recipient && !self.exclusions.excludes(gifter, recipient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::pairs;

    #[test]
    fn capture_dedups_roster() {
        let snapshot = Snapshot::capture([3, 1, 3, 2], pairs(&[(1, 2)]));
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.roster().iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn permits_rejects_self_and_excluded() {
        let snapshot = Snapshot::capture([1, 2], pairs(&[(1, 2)]));
        assert!(!snapshot.permits(1, 1));
        assert!(!snapshot.permits(1, 2));
        assert!(snapshot.permits(2, 1));
    }
}
