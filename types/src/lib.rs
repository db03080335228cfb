//! Fundamental types for the Coop governance engine.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! platform identifiers, surface references, timestamps, ballot records and the
//! persisted election cycle state.

pub mod ballot;
pub mod error;
pub mod id;
pub mod state;
pub mod time;

pub use ballot::{Candidate, Vote};
pub use error::TypesError;
pub use id::{ChannelId, GuildId, MessageId, MessageRef, UserId};
pub use state::ElectionCycleState;
pub use time::{Clock, SystemClock, Timestamp};
