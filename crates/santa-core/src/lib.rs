//! Secret Santa assignment core.
//!
//! Pure logic for turning a roster and its exclusion list into a one-to-one
//! gift assignment. No runtime I/O: time and randomness come from an
//! [`Environment`], storage sits behind [`AssignmentStore`].
//!
//! ## Pipeline
//!
//! ```text
//! roster + exclusion pairs
//!   └─ Snapshot            (immutable capture, ExclusionIndex)
//!        └─ feasibility    (every participant has a candidate)
//!             └─ shuffle   (randomized greedy, may deadlock)
//!                  └─ AssignmentStore::replace_assignments
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod exclusion;
pub mod feasibility;
pub mod participant;
pub mod shuffle;
pub mod snapshot;
pub mod store;

pub use env::Environment;
pub use exclusion::ExclusionIndex;
pub use feasibility::InfeasibleParticipant;
pub use participant::{Assignment, Exclusion, Participant, UserId};
pub use shuffle::{AssignmentSet, ShuffleError, shuffle};
pub use snapshot::Snapshot;
pub use store::{
    AssignmentStore, MemoryAssignmentStore, ReshuffleError, ShuffleReport, StoreError, reshuffle,
};
