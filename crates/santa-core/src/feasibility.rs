//! Feasibility pre-check.
//!
//! Verifies every participant has at least one eligible recipient under the
//! static exclusion graph before any assignment is attempted.
//!
//! ## Limitation
//!
//! The check is necessary but not sufficient. Each participant having a
//! candidate does not imply a perfect matching exists: with roster
//! `{A, B, C, D}` where A and D both exclude B and C, every participant
//! passes, yet A and D compete for each other and one of them may be
//! stranded. The engine reports that case as a deadlock.

use crate::{participant::UserId, snapshot::Snapshot};

/// A participant with no eligible recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("participant {0} has no eligible recipient")]
pub struct InfeasibleParticipant(pub UserId);

/// Check that every participant has at least one eligible recipient.
///
/// Participants are visited in ascending id order; the first one with an
/// empty candidate set is reported.
pub fn check(snapshot: &Snapshot) -> Result<(), InfeasibleParticipant> {
    for &gifter in snapshot.roster() {
        let has_candidate =
            snapshot.roster().iter().any(|&recipient| snapshot.permits(gifter, recipient));
        if !has_candidate {
            return Err(InfeasibleParticipant(gifter));
        }
    }
    Ok(())
}
