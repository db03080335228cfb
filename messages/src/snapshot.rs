//! Point-in-time views of platform objects.

use coop_types::{MessageRef, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Aggregate of one emoji's reactions on a message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCount {
    pub emoji: String,
    pub count: u64,
    /// Whether the engine's own account is among the reactors.
    pub me: bool,
}

impl ReactionCount {
    /// Reactions cast by others; the engine's seed reaction is not a vote.
    pub fn votes(&self) -> u64 {
        self.count.saturating_sub(u64::from(self.me))
    }
}

/// A fetched message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSnapshot {
    pub reference: MessageRef,
    pub author: UserId,
    pub content: String,
    /// Users mentioned in the content, in order of appearance.
    pub mentions: Vec<UserId>,
    pub reactions: Vec<ReactionCount>,
    pub created_at: Timestamp,
    pub edited_at: Option<Timestamp>,
}

impl MessageSnapshot {
    /// Votes cast with `emoji`, excluding the engine's own reaction.
    pub fn votes_for(&self, emoji: &str) -> u64 {
        self.reactions
            .iter()
            .filter(|r| r.emoji == emoji)
            .map(ReactionCount::votes)
            .sum()
    }

    /// When the message was last touched (edited, else created).
    pub fn last_touched(&self) -> Timestamp {
        self.edited_at.unwrap_or(self.created_at)
    }
}

/// A guild member, as far as status texts care.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: UserId,
    pub username: String,
    pub is_bot: bool,
}

/// Extract `<@id>` / `<@!id>` mentions from message markup.
pub fn parse_mentions(content: &str) -> Vec<UserId> {
    let mut mentions = Vec::new();
    let mut rest = content;
    while let Some(start) = rest.find("<@") {
        rest = &rest[start + 2..];
        let body = rest.strip_prefix('!').unwrap_or(rest);
        let Some(end) = body.find('>') else {
            break;
        };
        if let Ok(id) = body[..end].parse::<UserId>() {
            mentions.push(id);
        }
        rest = &body[end + 1..];
    }
    mentions
}
