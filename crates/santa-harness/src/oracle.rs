//! Assignment invariant oracle.
//!
//! Checks a committed assignment list against the snapshot it was produced
//! from, without reusing any engine code:
//!
//! - every participant gifts exactly once
//! - every participant receives exactly once
//! - nobody gifts to themselves
//! - no gifter is assigned someone they excluded

use std::collections::BTreeMap;

use santa_core::{Assignment, Snapshot, UserId};

/// First invariant a committed assignment list breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A participant has no assignment as gifter.
    MissingGifter(UserId),
    /// A participant gifts more than once.
    DuplicateGifter(UserId),
    /// A participant has no assignment as recipient.
    MissingRecipient(UserId),
    /// A participant receives more than once.
    DuplicateRecipient(UserId),
    /// Someone outside the roster appears in an assignment.
    Stranger(UserId),
    /// A participant gifts to themselves.
    SelfAssignment(UserId),
    /// A gifter was assigned someone they excluded.
    ExcludedPair {
        /// Gifter
        gifter: UserId,
        /// Recipient the gifter excluded
        recipient: UserId,
    },
}

/// Check `assignments` against `snapshot`.
pub fn verify_assignment_invariants(
    snapshot: &Snapshot,
    assignments: &[Assignment],
) -> Result<(), InvariantViolation> {
    let mut gifts: BTreeMap<UserId, usize> = BTreeMap::new();
    let mut receipts: BTreeMap<UserId, usize> = BTreeMap::new();

    for a in assignments {
        for user in [a.gifter, a.recipient] {
            if !snapshot.roster().contains(&user) {
                return Err(InvariantViolation::Stranger(user));
            }
        }
        if a.gifter == a.recipient {
            return Err(InvariantViolation::SelfAssignment(a.gifter));
        }
        if snapshot.exclusions().excluded_by(a.gifter).contains(&a.recipient) {
            return Err(InvariantViolation::ExcludedPair {
                gifter: a.gifter,
                recipient: a.recipient,
            });
        }
        *gifts.entry(a.gifter).or_default() += 1;
        *receipts.entry(a.recipient).or_default() += 1;
    }

    for &user in snapshot.roster() {
        match gifts.get(&user) {
            None => return Err(InvariantViolation::MissingGifter(user)),
            Some(&n) if n > 1 => return Err(InvariantViolation::DuplicateGifter(user)),
            Some(_) => {},
        }
        match receipts.get(&user) {
            None => return Err(InvariantViolation::MissingRecipient(user)),
            Some(&n) if n > 1 => return Err(InvariantViolation::DuplicateRecipient(user)),
            Some(_) => {},
        }
    }

    Ok(())
}
