//! Anonymous messaging relay.
//!
//! Resolves who an anonymous message goes to from the committed assignment
//! set, and records every message sent.

use std::time::SystemTime;

use santa_core::{AssignmentStore, StoreError, UserId};
use serde::{Deserialize, Serialize};

/// Which counterpart a message is for, from the sender's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// To the person the sender gifts to
    ToRecipient,
    /// To the person gifting to the sender
    ToGifter,
}

/// Resolved delivery target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Counterpart receiving the message
    pub to: UserId,
    /// True when the sender is the gifter writing to their recipient
    pub from_gifter: bool,
}

/// Errors while resolving a route.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// No epoch exists yet
    #[error("no shuffle has been performed yet")]
    NoShuffleYet,

    /// The sender is missing from the committed set
    #[error("no assignment found for user {0}")]
    AssignmentMissing(UserId),

    /// The assignment store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Resolve where a message from `user` in `direction` should go.
///
/// Both of the sender's assignments must exist, even though only one is
/// used, so a sender outside the committed set is always refused.
pub fn route<S>(store: &S, user: UserId, direction: Direction) -> Result<Route, RelayError>
where
    S: AssignmentStore + ?Sized,
{
    if !store.has_assignments()? {
        return Err(RelayError::NoShuffleYet);
    }

    let gifting_to = store.gifter_assignment(user)?;
    let gifted_by = store.recipient_assignment(user)?;
    let (Some(gifting_to), Some(gifted_by)) = (gifting_to, gifted_by) else {
        return Err(RelayError::AssignmentMissing(user));
    };

    Ok(match direction {
        Direction::ToRecipient => Route { to: gifting_to.recipient, from_gifter: true },
        Direction::ToGifter => Route { to: gifted_by.gifter, from_gifter: false },
    })
}

/// A relayed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymousMessage {
    /// Sender
    pub from: UserId,
    /// Counterpart
    pub to: UserId,
    /// Message body
    pub text: String,
    /// When the relay accepted it
    pub sent_at: SystemTime,
    /// True when the sender is the recipient's gifter
    pub from_gifter: bool,
}

/// Append-only record of relayed messages.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<AnonymousMessage>,
}

impl MessageLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted messages.
    pub fn from_messages(messages: Vec<AnonymousMessage>) -> Self {
        Self { messages }
    }

    /// Append a message.
    pub fn record(&mut self, message: AnonymousMessage) {
        tracing::debug!(from = message.from, to = message.to, "message recorded");
        self.messages.push(message);
    }

    /// Every message, oldest first.
    pub fn messages(&self) -> &[AnonymousMessage] {
        &self.messages
    }

    /// Number of recorded messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True if nothing was relayed.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use santa_core::{Assignment, AssignmentSet, MemoryAssignmentStore};

    use super::*;

    fn store_with(pairs: &[(UserId, UserId)]) -> MemoryAssignmentStore {
        let set = AssignmentSet::from_assignments(pairs.iter().map(|&(gifter, recipient)| {
            Assignment { gifter, recipient, created_at: SystemTime::UNIX_EPOCH }
        }))
        .expect("valid batch");
        MemoryAssignmentStore::with_assignments(set)
    }

    #[test]
    fn route_requires_epoch() {
        let store = MemoryAssignmentStore::new();
        assert_eq!(route(&store, 1, Direction::ToRecipient), Err(RelayError::NoShuffleYet));
    }

    #[test]
    fn route_resolves_both_directions() {
        let store = store_with(&[(1, 2), (2, 3), (3, 1)]);
        assert_eq!(
            route(&store, 1, Direction::ToRecipient),
            Ok(Route { to: 2, from_gifter: true })
        );
        assert_eq!(route(&store, 1, Direction::ToGifter), Ok(Route { to: 3, from_gifter: false }));
    }

    #[test]
    fn route_refuses_outsiders() {
        let store = store_with(&[(1, 2), (2, 1)]);
        assert_eq!(route(&store, 5, Direction::ToGifter), Err(RelayError::AssignmentMissing(5)));
    }

    #[test]
    fn log_keeps_messages_in_order() {
        let mut log = MessageLog::new();
        for (from, to) in [(1, 2), (2, 1), (3, 1)] {
            log.record(AnonymousMessage {
                from,
                to,
                text: format!("{from}->{to}"),
                sent_at: SystemTime::UNIX_EPOCH,
                from_gifter: true,
            });
        }
        let texts: Vec<_> = log.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["1->2", "2->1", "3->1"]);
        assert_eq!(log.len(), 3);

        let restored = MessageLog::from_messages(log.messages().to_vec());
        assert_eq!(restored.messages(), log.messages());
    }
}
