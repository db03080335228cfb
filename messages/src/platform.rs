//! The platform collaborator trait.

use async_trait::async_trait;
use coop_types::{ChannelId, GuildId, MessageRef, UserId};

use crate::{Member, MessageSnapshot, PlatformError};

/// Everything the engine needs from the chat platform.
///
/// Implementations must be cheap to call concurrently; the engine shares one
/// instance across the reconciler, the vote ingestor and the sacrifice flow.
#[async_trait]
pub trait MessagingPlatform: Send + Sync {
    /// The engine's own account.
    fn self_id(&self) -> UserId;

    async fn post_message(
        &self,
        channel: ChannelId,
        content: &str,
    ) -> Result<MessageRef, PlatformError>;

    async fn edit_message(&self, message: MessageRef, content: &str) -> Result<(), PlatformError>;

    async fn delete_message(&self, message: MessageRef) -> Result<(), PlatformError>;

    /// React as the engine itself.
    async fn add_reaction(&self, message: MessageRef, emoji: &str) -> Result<(), PlatformError>;

    /// Withdraw `user`'s reaction.
    async fn remove_reaction(
        &self,
        message: MessageRef,
        user: UserId,
        emoji: &str,
    ) -> Result<(), PlatformError>;

    async fn fetch_message(&self, message: MessageRef) -> Result<MessageSnapshot, PlatformError>;

    /// `None` when the user is not (or no longer) a member.
    async fn resolve_member(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> Result<Option<Member>, PlatformError>;

    async fn guild_population_size(&self, guild: GuildId) -> Result<u64, PlatformError>;

    async fn remove_member(
        &self,
        guild: GuildId,
        user: UserId,
        reason: &str,
    ) -> Result<(), PlatformError>;
}
