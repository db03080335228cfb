//! Inbound reaction events.

use coop_types::{MessageRef, UserId};
use serde::{Deserialize, Serialize};

/// Someone added a reaction to a message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub message: MessageRef,
    pub user: UserId,
    /// Whether the reacting account is a bot.
    pub user_is_bot: bool,
    pub emoji: String,
}
