//! Participant, exclusion and assignment records.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Platform user identifier.
pub type UserId = u64;

/// A registered member of the exchange.
///
/// Everything except `id` is display payload. The shuffle engine never reads
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Platform user id
    pub id: UserId,
    /// Platform handle, without the leading `@`
    pub username: Option<String>,
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
    /// Gift wishes
    pub wishes: Option<String>,
    /// Delivery address
    pub address: Option<String>,
    /// Contact phone number
    pub phone: Option<String>,
    /// When the participant registered
    pub registered_at: SystemTime,
}

impl Participant {
    /// Create a participant with no profile details filled in.
    pub fn new(id: UserId, registered_at: SystemTime) -> Self {
        Self {
            id,
            username: None,
            first_name: None,
            last_name: None,
            wishes: None,
            address: None,
            phone: None,
            registered_at,
        }
    }

    /// Human-facing name: `@username`, else first and last name, else the id.
    pub fn display_name(&self) -> String {
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            return format!("@{username}");
        }

        let mut name = self.first_name.clone().unwrap_or_default();
        if let Some(last) = self.last_name.as_deref().filter(|l| !l.is_empty()) {
            if !name.is_empty() {
                name.push(' ');
            }
            name.push_str(last);
        }

        if name.is_empty() { format!("ID: {}", self.id) } else { name }
    }
}

/// Directed refusal: `user` will not gift to `excluded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Exclusion {
    /// Owner of the exclusion
    pub user: UserId,
    /// User they refuse to gift to
    pub excluded: UserId,
}

impl Exclusion {
    /// Create an exclusion pair.
    pub fn new(user: UserId, excluded: UserId) -> Self {
        Self { user, excluded }
    }
}

impl From<(UserId, UserId)> for Exclusion {
    fn from((user, excluded): (UserId, UserId)) -> Self {
        Self { user, excluded }
    }
}

/// One committed gifter to recipient pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Who gives the gift
    pub gifter: UserId,
    /// Who receives it
    pub recipient: UserId,
    /// When the batch containing this assignment was produced
    pub created_at: SystemTime,
}

/// Exclusion pairs from `(user, excluded)` tuples.
#[cfg(test)]
pub(crate) fn pairs(raw: &[(UserId, UserId)]) -> Vec<Exclusion> {
    raw.iter().copied().map(Exclusion::from).collect()
}
