//! Coordinator
//!
//! Turns typed commands into state changes and actions.
//!
//! ## Responsibilities
//!
//! - Epoch gating: registration, profile edits and exclusion edits are
//!   refused once a shuffle has been committed
//! - Admin capability: admin commands check the configured allow-list
//! - Shuffle: capture a snapshot, reshuffle, retry deadlocks within the
//!   configured budget
//! - Relay: route anonymous messages to the sender's counterpart
//!
//! ## Design
//!
//! - Action-based: `handle` returns actions, the driver performs all I/O
//! - Single writer: `handle` takes `&mut self`; the driver keeps the
//!   coordinator behind one mutex so clear + shuffle + commit never interleave

use santa_core::{
    AssignmentSet, AssignmentStore, Environment, MemoryAssignmentStore, Participant, UserId,
    reshuffle,
};

use crate::{
    config::{AdminList, ServerConfig},
    error::CommandError,
    registry::{ProfileField, Registration, Registry, RegistryError},
    relay::{self, AnonymousMessage, Direction, MessageLog},
    state::{STATE_VERSION, StateError, StateSnapshot},
};

/// A parsed request from a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List available commands
    Help,
    /// Join the exchange
    Register(Registration),
    /// Show own profile and exclusions
    MyInfo,
    /// Show the profile of the person the sender gifts to
    RecipientInfo,
    /// Set a profile field
    UpdateProfile {
        /// Field to set
        field: ProfileField,
        /// New value
        value: String,
    },
    /// Refuse to gift to a user
    Exclude {
        /// Target username
        username: String,
    },
    /// Withdraw an exclusion
    Unexclude {
        /// Target username
        username: String,
    },
    /// List own exclusions
    ListExclusions,
    /// Send an anonymous message to a counterpart
    Message {
        /// Which counterpart
        direction: Direction,
        /// Message body
        text: String,
    },
    /// Admin: run the shuffle
    Shuffle,
    /// Admin: send every gifter their recipient's profile
    SendInfo,
    /// Admin: list participants
    Participants,
    /// Admin: counts and epoch flag
    Stats,
}

impl Command {
    /// Whether only admins may issue this command.
    pub fn requires_admin(&self) -> bool {
        matches!(self, Self::Shuffle | Self::SendInfo | Self::Participants | Self::Stats)
    }
}

/// Display-ready view of a participant profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
    /// Display name
    pub name: String,
    /// Gift wishes
    pub wishes: Option<String>,
    /// Delivery address
    pub address: Option<String>,
    /// Phone number
    pub phone: Option<String>,
}

impl From<&Participant> for ProfileView {
    fn from(p: &Participant) -> Self {
        Self {
            name: p.display_name(),
            wishes: p.wishes.clone(),
            address: p.address.clone(),
            phone: p.phone.clone(),
        }
    }
}

/// Typed reply to the command's sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Command overview
    Help {
        /// Whether to include admin commands
        is_admin: bool,
    },
    /// Registration succeeded
    Registered,
    /// Own profile
    MyInfo {
        /// Profile
        profile: ProfileView,
        /// Display names of excluded users
        exclusions: Vec<String>,
    },
    /// Recipient's profile
    RecipientInfo(ProfileView),
    /// Profile field saved
    ProfileUpdated(ProfileField),
    /// Exclusion added
    ExclusionAdded {
        /// Display name of the excluded user
        name: String,
    },
    /// Exclusion removed
    ExclusionRemoved {
        /// Display name of the no-longer-excluded user
        name: String,
    },
    /// Own exclusions
    Exclusions(Vec<String>),
    /// Anonymous message accepted
    MessageSent,
    /// Shuffle committed
    ShuffleCommitted {
        /// Assignments in the new set
        assigned: usize,
        /// Attempts used
        attempts: u32,
    },
    /// Recipient info queued for delivery
    InfoSent {
        /// Deliveries queued
        queued: usize,
        /// Gifters skipped because their recipient's profile is missing
        skipped: usize,
    },
    /// Participant display names in registration order
    Participants(Vec<String>),
    /// Deployment statistics
    Stats {
        /// Registered participants
        participants: usize,
        /// Whether an epoch exists
        shuffled: bool,
        /// Stored assignments
        assignments: usize,
    },
}

/// Content pushed to a user who did not issue the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Relayed anonymous message
    Anonymous {
        /// True when written by the receiver's gifter
        from_gifter: bool,
        /// Message body
        text: String,
    },
    /// The receiver's assigned recipient
    RecipientInfo(ProfileView),
}

/// Actions returned by the coordinator for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotAction {
    /// Answer the command's sender
    Reply {
        /// Sender
        to: UserId,
        /// Reply content
        reply: Reply,
    },
    /// Push content to another user
    Deliver {
        /// Receiver
        to: UserId,
        /// Content
        delivery: Delivery,
    },
    /// State changed; persist a snapshot
    PersistState,
}

/// Command handler for one deployment.
pub struct Coordinator<E, S = MemoryAssignmentStore>
where
    E: Environment,
    S: AssignmentStore,
{
    registry: Registry,
    store: S,
    messages: MessageLog,
    admins: AdminList,
    shuffle_attempts: u32,
    env: E,
}

impl<E> Coordinator<E, MemoryAssignmentStore>
where
    E: Environment,
{
    /// Create a coordinator with an empty in-memory store.
    pub fn new(config: &ServerConfig, env: E) -> Self {
        Self::with_store(config, env, MemoryAssignmentStore::new())
    }

    /// Resume from a persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Corrupt` if the stored assignments are not a
    /// single consistent batch.
    pub fn from_state(
        config: &ServerConfig,
        env: E,
        state: StateSnapshot,
    ) -> Result<Self, StateError> {
        let set = AssignmentSet::from_assignments(state.assignments).ok_or_else(|| {
            StateError::Corrupt("assignment set repeats a gifter or recipient".to_string())
        })?;

        let mut coordinator =
            Self::with_store(config, env, MemoryAssignmentStore::with_assignments(set));
        coordinator.registry = Registry::from_parts(state.participants, state.exclusions);
        coordinator.messages = MessageLog::from_messages(state.messages);
        Ok(coordinator)
    }
}

impl<E, S> Coordinator<E, S>
where
    E: Environment,
    S: AssignmentStore,
{
    /// Create a coordinator over `store`.
    pub fn with_store(config: &ServerConfig, env: E, store: S) -> Self {
        Self {
            registry: Registry::new(),
            store,
            messages: MessageLog::new(),
            admins: config.admins.clone(),
            shuffle_attempts: config.shuffle_attempts.max(1),
            env,
        }
    }

    /// Participant registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Assignment store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Relayed messages.
    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    /// Whether `user` holds the admin capability.
    pub fn is_admin(&self, user: UserId) -> bool {
        self.admins.is_admin(user)
    }

    /// Capture the current state for persistence.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Store` if the assignment store is unreadable.
    pub fn export_state(&self) -> Result<StateSnapshot, CommandError> {
        Ok(StateSnapshot {
            version: STATE_VERSION,
            participants: self.registry.participants().into_iter().cloned().collect(),
            exclusions: self.registry.exclusions().collect(),
            assignments: self.store.assignments()?,
            messages: self.messages.messages().to_vec(),
        })
    }

    /// Handle one command from `sender`.
    ///
    /// Every successful command yields a `BotAction::Reply` to the sender.
    ///
    /// # Errors
    ///
    /// Returns the reason the command was refused. Refused commands change
    /// no state, except a failed `Shuffle`, which leaves no epoch behind.
    pub fn handle(
        &mut self,
        sender: UserId,
        command: Command,
    ) -> Result<Vec<BotAction>, CommandError> {
        if command.requires_admin() && !self.is_admin(sender) {
            tracing::warn!(sender, ?command, "admin command refused");
            return Err(CommandError::NotAdmin(sender));
        }

        let reply = |reply| BotAction::Reply { to: sender, reply };

        match command {
            Command::Help => Ok(vec![reply(Reply::Help { is_admin: self.is_admin(sender) })]),

            Command::Register(registration) => {
                if self.shuffled()? {
                    return Err(CommandError::RegistrationClosed);
                }
                self.registry.register(sender, registration, self.env.now())?;
                Ok(vec![reply(Reply::Registered), BotAction::PersistState])
            },

            Command::MyInfo => {
                let profile = ProfileView::from(self.registry.require(sender)?);
                let exclusions = self.exclusion_names(sender);
                Ok(vec![reply(Reply::MyInfo { profile, exclusions })])
            },

            Command::RecipientInfo => {
                if !self.shuffled()? {
                    return Err(CommandError::NoShuffleYet);
                }
                self.registry.require(sender)?;
                let assignment = self
                    .store
                    .gifter_assignment(sender)?
                    .ok_or(CommandError::AssignmentMissing(sender))?;
                let recipient = self
                    .registry
                    .participant(assignment.recipient)
                    .ok_or(CommandError::AssignmentMissing(assignment.recipient))?;
                Ok(vec![reply(Reply::RecipientInfo(ProfileView::from(recipient)))])
            },

            Command::UpdateProfile { field, value } => {
                self.ensure_open()?;
                self.registry.update_profile(sender, field, &value)?;
                Ok(vec![reply(Reply::ProfileUpdated(field)), BotAction::PersistState])
            },

            Command::Exclude { username } => {
                self.ensure_open()?;
                let target = self.resolve(sender, &username)?;
                self.registry.add_exclusion(sender, target.id)?;
                let name = target.display_name();
                Ok(vec![reply(Reply::ExclusionAdded { name }), BotAction::PersistState])
            },

            Command::Unexclude { username } => {
                self.ensure_open()?;
                let target = self.resolve(sender, &username)?;
                self.registry.remove_exclusion(sender, target.id)?;
                let name = target.display_name();
                Ok(vec![reply(Reply::ExclusionRemoved { name }), BotAction::PersistState])
            },

            Command::ListExclusions => {
                self.ensure_open()?;
                self.registry.require(sender)?;
                Ok(vec![reply(Reply::Exclusions(self.exclusion_names(sender)))])
            },

            Command::Message { direction, text } => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    return Err(CommandError::EmptyMessage);
                }

                let route = relay::route(&self.store, sender, direction)?;
                self.registry
                    .participant(route.to)
                    .ok_or(CommandError::AssignmentMissing(route.to))?;

                self.messages.record(AnonymousMessage {
                    from: sender,
                    to: route.to,
                    text: text.clone(),
                    sent_at: self.env.now(),
                    from_gifter: route.from_gifter,
                });

                Ok(vec![
                    BotAction::Deliver {
                        to: route.to,
                        delivery: Delivery::Anonymous { from_gifter: route.from_gifter, text },
                    },
                    reply(Reply::MessageSent),
                    BotAction::PersistState,
                ])
            },

            Command::Shuffle => {
                let (assigned, attempts) = self.run_shuffle()?;
                Ok(vec![reply(Reply::ShuffleCommitted { assigned, attempts }), BotAction::PersistState])
            },

            Command::SendInfo => {
                if !self.shuffled()? {
                    return Err(CommandError::NoShuffleYet);
                }

                let mut actions = Vec::new();
                let mut skipped = 0;
                for assignment in self.store.assignments()? {
                    match self.registry.participant(assignment.recipient) {
                        Some(recipient) => actions.push(BotAction::Deliver {
                            to: assignment.gifter,
                            delivery: Delivery::RecipientInfo(ProfileView::from(recipient)),
                        }),
                        None => {
                            tracing::warn!(gifter = assignment.gifter, "recipient profile missing");
                            skipped += 1;
                        },
                    }
                }
                let queued = actions.len();
                actions.push(reply(Reply::InfoSent { queued, skipped }));
                Ok(actions)
            },

            Command::Participants => {
                let names = self.registry.participants().iter().map(|p| p.display_name()).collect();
                Ok(vec![reply(Reply::Participants(names))])
            },

            Command::Stats => Ok(vec![reply(Reply::Stats {
                participants: self.registry.len(),
                shuffled: self.shuffled()?,
                assignments: self.store.assignment_count()?,
            })]),
        }
    }

    fn shuffled(&self) -> Result<bool, CommandError> {
        Ok(self.store.has_assignments()?)
    }

    fn ensure_open(&self) -> Result<(), CommandError> {
        if self.shuffled()? { Err(CommandError::EpochLocked) } else { Ok(()) }
    }

    /// Resolve `username` to a participant on behalf of a registered sender.
    fn resolve(&self, sender: UserId, username: &str) -> Result<Participant, CommandError> {
        self.registry.require(sender)?;
        let target = self.registry.find_by_username(username).ok_or_else(|| {
            RegistryError::UnknownUsername(username.trim().trim_start_matches('@').to_string())
        })?;
        Ok(target.clone())
    }

    fn exclusion_names(&self, user: UserId) -> Vec<String> {
        self.registry.exclusions_of(user).iter().map(|p| p.display_name()).collect()
    }

    /// Reshuffle, retrying deadlocks until the attempt budget runs out.
    fn run_shuffle(&mut self) -> Result<(usize, u32), CommandError> {
        let snapshot = self.registry.snapshot();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match reshuffle(&self.store, &snapshot, &self.env) {
                Ok(report) => {
                    tracing::info!(
                        participants = report.assigned,
                        attempts = attempt,
                        replaced = report.replaced_previous,
                        "shuffle committed"
                    );
                    return Ok((report.assigned, attempt));
                },
                Err(e) if e.is_retryable() && attempt < self.shuffle_attempts => {
                    tracing::warn!(attempt, "shuffle attempt deadlocked, retrying");
                },
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "shuffle failed");
                    return Err(e.into());
                },
            }
        }
    }
}

impl<E, S> std::fmt::Debug for Coordinator<E, S>
where
    E: Environment,
    S: AssignmentStore,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("participants", &self.registry.len())
            .field("messages", &self.messages.len())
            .field("admins", &self.admins.len())
            .field("shuffle_attempts", &self.shuffle_attempts)
            .finish_non_exhaustive()
    }
}
