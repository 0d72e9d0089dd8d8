//! Participant registry.
//!
//! Holds registered participants and their exclusion lists. The registry
//! itself has no notion of epochs; the coordinator refuses mutations once a
//! shuffle has been committed.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    time::SystemTime,
};

use santa_core::{Exclusion, Participant, Snapshot, UserId};

/// Editable profile fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    /// Gift wishes
    Wishes,
    /// Delivery address
    Address,
    /// Phone number
    Phone,
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wishes => write!(f, "wishes"),
            Self::Address => write!(f, "address"),
            Self::Phone => write!(f, "phone"),
        }
    }
}

/// Platform identity captured at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    /// Platform handle, with or without a leading `@`
    pub username: Option<String>,
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
}

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// User already registered
    #[error("user {0} is already registered")]
    AlreadyRegistered(UserId),

    /// User not registered
    #[error("user {0} is not registered")]
    NotRegistered(UserId),

    /// No registered participant has this username
    #[error("no registered user named @{0}")]
    UnknownUsername(String),

    /// Blank profile value
    #[error("{0} must not be empty")]
    EmptyField(ProfileField),

    /// Users may not exclude themselves
    #[error("cannot exclude yourself")]
    SelfExclusion,

    /// Exclusion already present
    #[error("user {0} is already excluded")]
    AlreadyExcluded(UserId),

    /// Exclusion not present
    #[error("user {0} is not excluded")]
    NotExcluded(UserId),
}

/// Registered participants and exclusion pairs.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    participants: BTreeMap<UserId, Participant>,
    exclusions: BTreeSet<Exclusion>,
}

fn strip_handle(name: &str) -> &str {
    name.trim().trim_start_matches('@')
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from persisted parts.
    ///
    /// Exclusions whose owner is not a participant are dropped.
    pub fn from_parts(
        participants: impl IntoIterator<Item = Participant>,
        exclusions: impl IntoIterator<Item = Exclusion>,
    ) -> Self {
        let participants: BTreeMap<_, _> = participants.into_iter().map(|p| (p.id, p)).collect();
        let exclusions =
            exclusions.into_iter().filter(|e| participants.contains_key(&e.user)).collect();
        Self { participants, exclusions }
    }

    /// Register `user`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::AlreadyRegistered` if `user` is present.
    pub fn register(
        &mut self,
        user: UserId,
        registration: Registration,
        now: SystemTime,
    ) -> Result<&Participant, RegistryError> {
        if self.participants.contains_key(&user) {
            return Err(RegistryError::AlreadyRegistered(user));
        }

        let mut participant = Participant::new(user, now);
        participant.username = registration
            .username
            .as_deref()
            .map(strip_handle)
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        participant.first_name = registration.first_name;
        participant.last_name = registration.last_name;

        tracing::info!(user, "participant registered");
        Ok(self.participants.entry(user).or_insert(participant))
    }

    /// Look up a participant.
    pub fn participant(&self, user: UserId) -> Option<&Participant> {
        self.participants.get(&user)
    }

    /// Look up a participant, failing if absent.
    pub fn require(&self, user: UserId) -> Result<&Participant, RegistryError> {
        self.participant(user).ok_or(RegistryError::NotRegistered(user))
    }

    /// Find a participant by username. A leading `@` is ignored.
    pub fn find_by_username(&self, name: &str) -> Option<&Participant> {
        let name = strip_handle(name);
        self.participants.values().find(|p| p.username.as_deref() == Some(name))
    }

    /// Participants in registration order, ties broken by id.
    pub fn participants(&self) -> Vec<&Participant> {
        let mut list: Vec<_> = self.participants.values().collect();
        list.sort_by_key(|p| (p.registered_at, p.id));
        list
    }

    /// Number of registered participants.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// True if nobody has registered.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Set one profile field. The value is trimmed.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::EmptyField` for blank values and
    /// `RegistryError::NotRegistered` for unknown users.
    pub fn update_profile(
        &mut self,
        user: UserId,
        field: ProfileField,
        value: &str,
    ) -> Result<(), RegistryError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(RegistryError::EmptyField(field));
        }

        let participant =
            self.participants.get_mut(&user).ok_or(RegistryError::NotRegistered(user))?;
        let slot = match field {
            ProfileField::Wishes => &mut participant.wishes,
            ProfileField::Address => &mut participant.address,
            ProfileField::Phone => &mut participant.phone,
        };
        *slot = Some(value.to_string());

        tracing::debug!(user, %field, "profile updated");
        Ok(())
    }

    /// Record that `user` refuses to gift to `target`.
    ///
    /// # Errors
    ///
    /// Fails if either side is unregistered, if `user == target`, or if the
    /// exclusion already exists.
    pub fn add_exclusion(&mut self, user: UserId, target: UserId) -> Result<(), RegistryError> {
        self.require(user)?;
        self.require(target)?;
        if user == target {
            return Err(RegistryError::SelfExclusion);
        }
        if !self.exclusions.insert(Exclusion::new(user, target)) {
            return Err(RegistryError::AlreadyExcluded(target));
        }
        Ok(())
    }

    /// Remove an exclusion owned by `user`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotExcluded` if the pair is absent.
    pub fn remove_exclusion(&mut self, user: UserId, target: UserId) -> Result<(), RegistryError> {
        self.require(user)?;
        if user == target {
            return Err(RegistryError::SelfExclusion);
        }
        if !self.exclusions.remove(&Exclusion::new(user, target)) {
            return Err(RegistryError::NotExcluded(target));
        }
        Ok(())
    }

    /// Participants excluded by `user`, in id order.
    pub fn exclusions_of(&self, user: UserId) -> Vec<&Participant> {
        self.exclusions
            .range(Exclusion::new(user, UserId::MIN)..=Exclusion::new(user, UserId::MAX))
            .filter_map(|e| self.participants.get(&e.excluded))
            .collect()
    }

    /// Every exclusion pair.
    pub fn exclusions(&self) -> impl Iterator<Item = Exclusion> + '_ {
        self.exclusions.iter().copied()
    }

    /// All participant ids.
    pub fn roster(&self) -> impl Iterator<Item = UserId> + '_ {
        self.participants.keys().copied()
    }

    /// Capture roster and exclusions for the shuffle engine.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self.roster(), self.exclusions())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn named(name: &str) -> Registration {
        Registration { username: Some(name.to_string()), ..Registration::default() }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register(1, named("@alice"), at(30)).expect("fresh");
        registry.register(2, named("bob"), at(10)).expect("fresh");
        registry.register(3, Registration::default(), at(20)).expect("fresh");
        registry
    }

    #[test]
    fn register_rejects_duplicate() {
        let mut registry = registry();
        assert_eq!(
            registry.register(1, Registration::default(), at(40)).err(),
            Some(RegistryError::AlreadyRegistered(1))
        );
    }

    #[test]
    fn username_is_stored_without_handle_prefix() {
        let registry = registry();
        assert_eq!(registry.find_by_username("alice").map(|p| p.id), Some(1));
        assert_eq!(registry.find_by_username("@bob").map(|p| p.id), Some(2));
        assert!(registry.find_by_username("carol").is_none());
    }

    #[test]
    fn participants_follow_registration_order() {
        let registry = registry();
        let order: Vec<_> = registry.participants().iter().map(|p| p.id).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn update_profile_trims_and_rejects_blank() {
        let mut registry = registry();
        registry.update_profile(1, ProfileField::Wishes, "  socks ").expect("valid");
        assert_eq!(registry.participant(1).and_then(|p| p.wishes.as_deref()), Some("socks"));

        assert_eq!(
            registry.update_profile(1, ProfileField::Phone, "   "),
            Err(RegistryError::EmptyField(ProfileField::Phone))
        );
        assert_eq!(
            registry.update_profile(9, ProfileField::Address, "North Pole"),
            Err(RegistryError::NotRegistered(9))
        );
    }

    #[test]
    fn exclusion_lifecycle() {
        let mut registry = registry();
        registry.add_exclusion(1, 2).expect("valid");
        assert_eq!(registry.add_exclusion(1, 2), Err(RegistryError::AlreadyExcluded(2)));
        assert_eq!(registry.add_exclusion(1, 1), Err(RegistryError::SelfExclusion));
        assert_eq!(registry.add_exclusion(1, 9), Err(RegistryError::NotRegistered(9)));

        assert_eq!(registry.exclusions_of(1).iter().map(|p| p.id).collect::<Vec<_>>(), vec![2]);
        assert!(registry.exclusions_of(2).is_empty());

        registry.remove_exclusion(1, 2).expect("present");
        assert_eq!(registry.remove_exclusion(1, 2), Err(RegistryError::NotExcluded(2)));
    }

    #[test]
    fn snapshot_carries_roster_and_exclusions() {
        let mut registry = registry();
        registry.add_exclusion(3, 1).expect("valid");

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.exclusions().excludes(3, 1));
        assert!(!snapshot.exclusions().excludes(1, 3));
    }

    #[test]
    fn from_parts_drops_orphan_exclusions() {
        let people = vec![Participant::new(1, at(0)), Participant::new(2, at(0))];
        let registry =
            Registry::from_parts(people, [Exclusion::new(1, 2), Exclusion::new(7, 1)]);
        assert_eq!(registry.exclusions().count(), 1);
    }
}
