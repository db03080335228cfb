//! Platform identifiers.
//!
//! Every object on the messaging platform (users, channels, messages, guilds)
//! is addressed by a 64-bit snowflake. The newtypes keep them from being mixed
//! up at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(&self) -> u64 {
                self.0
            }

            /// Big-endian key bytes, so byte order matches numeric order.
            pub fn to_be_bytes(&self) -> [u8; 8] {
                self.0.to_be_bytes()
            }

            pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
                Self(u64::from_be_bytes(bytes))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| TypesError::InvalidId(s.to_string()))
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

snowflake!(
    /// A community member (or bot) account.
    UserId
);
snowflake!(
    /// A channel inside the community guild.
    ChannelId
);
snowflake!(
    /// A single message inside a channel.
    MessageId
);
snowflake!(
    /// The community guild itself.
    GuildId
);

impl UserId {
    /// Platform mention markup, e.g. `<@1234>`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl ChannelId {
    /// Platform channel markup, e.g. `<#1234>`.
    pub fn mention(&self) -> String {
        format!("<#{}>", self.0)
    }
}

/// Pointer to a message on the platform: the ballot surface of a candidate,
/// a sacrifice ballot, or the election status surface.
///
/// Rendered as `channel/message`; the same text is what the config store keeps
/// under `election_message_link`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel: ChannelId,
    pub message: MessageId,
}

impl MessageRef {
    pub const KEY_LEN: usize = 16;

    pub fn new(channel: ChannelId, message: MessageId) -> Self {
        Self { channel, message }
    }

    /// Fixed-width storage key: channel then message, both big-endian.
    pub fn to_key(&self) -> [u8; Self::KEY_LEN] {
        let mut key = [0u8; Self::KEY_LEN];
        key[..8].copy_from_slice(&self.channel.to_be_bytes());
        key[8..].copy_from_slice(&self.message.to_be_bytes());
        key
    }

    /// Web link to the message inside the given guild.
    pub fn link(&self, guild: GuildId) -> String {
        format!(
            "https://discord.com/channels/{}/{}/{}",
            guild, self.channel, self.message
        )
    }

    /// Parse either `channel/message` or a full message link
    /// (`…/channels/<guild>/<channel>/<message>`).
    pub fn parse_link(link: &str) -> Result<Self, TypesError> {
        let invalid = || TypesError::InvalidMessageRef(link.to_string());
        let mut parts = link.trim().trim_end_matches('/').rsplit('/');
        let message = parts.next().ok_or_else(invalid)?;
        let channel = parts.next().ok_or_else(invalid)?;
        Ok(Self {
            channel: channel.parse().map_err(|_| invalid())?,
            message: message.parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel, self.message)
    }
}

impl FromStr for MessageRef {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_link(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ref_display_parses_back() {
        let r = MessageRef::new(ChannelId::new(42), MessageId::new(7));
        assert_eq!(r.to_string(), "42/7");
        assert_eq!("42/7".parse::<MessageRef>().unwrap(), r);
    }

    #[test]
    fn parses_full_message_link() {
        let r = MessageRef::parse_link("https://discord.com/channels/1/22/333").unwrap();
        assert_eq!(r.channel, ChannelId::new(22));
        assert_eq!(r.message, MessageId::new(333));
    }

    #[test]
    fn rejects_garbage_links() {
        assert!(MessageRef::parse_link("").is_err());
        assert!(MessageRef::parse_link("12").is_err());
        assert!(MessageRef::parse_link("abc/def").is_err());
    }

    #[test]
    fn key_orders_by_channel_then_message() {
        let a = MessageRef::new(ChannelId::new(1), MessageId::new(900));
        let b = MessageRef::new(ChannelId::new(2), MessageId::new(1));
        assert!(a.to_key() < b.to_key());
    }

    #[test]
    fn mention_markup() {
        assert_eq!(UserId::new(5).mention(), "<@5>");
        assert_eq!(ChannelId::new(6).mention(), "<#6>");
    }
}
