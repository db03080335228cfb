//! Messaging platform contract for the Coop governance engine.
//!
//! The engine never talks to the chat platform directly. It sees messages as
//! surfaces that carry reaction counts, and it receives reaction events. The
//! transport itself lives outside this workspace behind [`MessagingPlatform`].

pub mod error;
pub mod event;
pub mod platform;
pub mod snapshot;

pub use error::PlatformError;
pub use event::ReactionEvent;
pub use platform::MessagingPlatform;
pub use snapshot::{parse_mentions, Member, MessageSnapshot, ReactionCount};
