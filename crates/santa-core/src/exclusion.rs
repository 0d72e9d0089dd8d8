//! Exclusion index.
//!
//! Collapses a flat list of `(user, excluded)` pairs into a per-user set.
//! Users without exclusions have no entry; lookups for them return the
//! empty set.

use std::collections::{BTreeMap, BTreeSet};

use crate::participant::{Exclusion, UserId};

static EMPTY: BTreeSet<UserId> = BTreeSet::new();

/// Mapping from each user to the users they refuse as a recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionIndex {
    by_user: BTreeMap<UserId, BTreeSet<UserId>>,
}

impl ExclusionIndex {
    /// Build the index from exclusion pairs. Duplicate pairs collapse.
    pub fn build<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = Exclusion>,
    {
        let mut by_user: BTreeMap<UserId, BTreeSet<UserId>> = BTreeMap::new();
        for Exclusion { user, excluded } in pairs {
            by_user.entry(user).or_default().insert(excluded);
        }
        Self { by_user }
    }

    /// Users excluded by `user`. Empty if `user` has no entry.
    pub fn excluded_by(&self, user: UserId) -> &BTreeSet<UserId> {
        self.by_user.get(&user).unwrap_or(&EMPTY)
    }

    /// Whether `user` refuses to gift to `candidate`.
    pub fn excludes(&self, user: UserId, candidate: UserId) -> bool {
        self.by_user.get(&user).is_some_and(|set| set.contains(&candidate))
    }

    /// Number of users with at least one exclusion.
    pub fn len(&self) -> usize {
        self.by_user.len()
    }

    /// True if nobody excludes anybody.
    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }

    /// Iterate over every distinct pair in the index.
    pub fn pairs(&self) -> impl Iterator<Item = Exclusion> + '_ {
        self.by_user
            .iter()
            .flat_map(|(&user, set)| set.iter().map(move |&excluded| Exclusion { user, excluded }))
    }
}
