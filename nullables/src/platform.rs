//! Nullable messaging platform: an in-memory guild.
//!
//! Messages, reactions and members live in a map. Every call the engine makes
//! is applied to that state, so tests can assert on what the guild looks like
//! afterwards (posted texts, who reacted, who was removed).

use async_trait::async_trait;
use coop_messages::{
    parse_mentions, Member, MessageSnapshot, MessagingPlatform, PlatformError, ReactionCount,
    ReactionEvent,
};
use coop_types::{ChannelId, Clock, GuildId, MessageId, MessageRef, Timestamp, UserId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::NullClock;

struct NullMessage {
    author: UserId,
    content: String,
    /// Emoji in first-reaction order, each with its reactors.
    reactions: Vec<(String, Vec<UserId>)>,
    created_at: Timestamp,
    edited_at: Option<Timestamp>,
}

#[derive(Default)]
struct GuildState {
    next_message_id: u64,
    messages: BTreeMap<MessageRef, NullMessage>,
    members: HashMap<UserId, Member>,
    population: Option<u64>,
    removed_members: Vec<UserId>,
    fetch_count: usize,
    unavailable: bool,
}

/// An in-memory guild implementing [`MessagingPlatform`].
pub struct NullPlatform {
    self_id: UserId,
    clock: Arc<NullClock>,
    state: Mutex<GuildState>,
}

impl NullPlatform {
    pub fn new(self_id: UserId) -> Self {
        Self::with_clock(self_id, Arc::new(NullClock::new(0)))
    }

    /// Message timestamps follow `clock`.
    pub fn with_clock(self_id: UserId, clock: Arc<NullClock>) -> Self {
        Self {
            self_id,
            clock,
            state: Mutex::new(GuildState {
                next_message_id: 1,
                ..Default::default()
            }),
        }
    }

    pub fn add_member(&self, id: UserId, username: &str) {
        self.state.lock().unwrap().members.insert(
            id,
            Member {
                id,
                username: username.to_string(),
                is_bot: false,
            },
        );
    }

    /// Override the population figure (defaults to the member count).
    pub fn set_population(&self, population: u64) {
        self.state.lock().unwrap().population = Some(population);
    }

    /// Make every call fail with [`PlatformError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    /// Post a message as another user.
    pub fn seed_message(&self, channel: ChannelId, author: UserId, content: &str) -> MessageRef {
        self.insert_message(channel, author, content)
    }

    /// A user reacts; returns the event the platform would deliver.
    pub fn react(&self, message: MessageRef, user: UserId, emoji: &str) -> ReactionEvent {
        let mut state = self.state.lock().unwrap();
        let user_is_bot = state.members.get(&user).is_some_and(|m| m.is_bot);
        if let Some(msg) = state.messages.get_mut(&message) {
            add_reactor(msg, user, emoji);
        }
        ReactionEvent {
            message,
            user,
            user_is_bot,
            emoji: emoji.to_string(),
        }
    }

    /// Delete a message behind the engine's back.
    pub fn vanish(&self, message: MessageRef) {
        self.state.lock().unwrap().messages.remove(&message);
    }

    pub fn content(&self, message: MessageRef) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .messages
            .get(&message)
            .map(|m| m.content.clone())
    }

    pub fn exists(&self, message: MessageRef) -> bool {
        self.state.lock().unwrap().messages.contains_key(&message)
    }

    /// Contents of every live message in `channel`, oldest first.
    pub fn channel_contents(&self, channel: ChannelId) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|(r, _)| r.channel == channel)
            .map(|(_, m)| m.content.clone())
            .collect()
    }

    pub fn reactors(&self, message: MessageRef, emoji: &str) -> Vec<UserId> {
        self.state
            .lock()
            .unwrap()
            .messages
            .get(&message)
            .and_then(|m| m.reactions.iter().find(|(e, _)| e == emoji))
            .map(|(_, users)| users.clone())
            .unwrap_or_default()
    }

    pub fn removed_members(&self) -> Vec<UserId> {
        self.state.lock().unwrap().removed_members.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.state.lock().unwrap().fetch_count
    }

    fn insert_message(&self, channel: ChannelId, author: UserId, content: &str) -> MessageRef {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        let id = state.next_message_id;
        state.next_message_id += 1;
        let reference = MessageRef::new(channel, MessageId::new(id));
        state.messages.insert(
            reference,
            NullMessage {
                author,
                content: content.to_string(),
                reactions: Vec::new(),
                created_at: now,
                edited_at: None,
            },
        );
        reference
    }

    fn check_available(&self) -> Result<(), PlatformError> {
        if self.state.lock().unwrap().unavailable {
            Err(PlatformError::Unavailable("null platform switched off".into()))
        } else {
            Ok(())
        }
    }
}

fn add_reactor(msg: &mut NullMessage, user: UserId, emoji: &str) {
    match msg.reactions.iter_mut().find(|(e, _)| e == emoji) {
        Some((_, users)) => {
            if !users.contains(&user) {
                users.push(user);
            }
        }
        None => msg.reactions.push((emoji.to_string(), vec![user])),
    }
}

#[async_trait]
impl MessagingPlatform for NullPlatform {
    fn self_id(&self) -> UserId {
        self.self_id
    }

    async fn post_message(
        &self,
        channel: ChannelId,
        content: &str,
    ) -> Result<MessageRef, PlatformError> {
        self.check_available()?;
        Ok(self.insert_message(channel, self.self_id, content))
    }

    async fn edit_message(&self, message: MessageRef, content: &str) -> Result<(), PlatformError> {
        self.check_available()?;
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        let msg = state
            .messages
            .get_mut(&message)
            .ok_or(PlatformError::NotFound(message))?;
        msg.content = content.to_string();
        msg.edited_at = Some(now);
        Ok(())
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), PlatformError> {
        self.check_available()?;
        self.state
            .lock()
            .unwrap()
            .messages
            .remove(&message)
            .map(|_| ())
            .ok_or(PlatformError::NotFound(message))
    }

    async fn add_reaction(&self, message: MessageRef, emoji: &str) -> Result<(), PlatformError> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        let msg = state
            .messages
            .get_mut(&message)
            .ok_or(PlatformError::NotFound(message))?;
        add_reactor(msg, self.self_id, emoji);
        Ok(())
    }

    async fn remove_reaction(
        &self,
        message: MessageRef,
        user: UserId,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        let msg = state
            .messages
            .get_mut(&message)
            .ok_or(PlatformError::NotFound(message))?;
        if let Some((_, users)) = msg.reactions.iter_mut().find(|(e, _)| e == emoji) {
            users.retain(|u| *u != user);
        }
        msg.reactions.retain(|(_, users)| !users.is_empty());
        Ok(())
    }

    async fn fetch_message(&self, message: MessageRef) -> Result<MessageSnapshot, PlatformError> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        state.fetch_count += 1;
        let msg = state
            .messages
            .get(&message)
            .ok_or(PlatformError::NotFound(message))?;
        Ok(MessageSnapshot {
            reference: message,
            author: msg.author,
            content: msg.content.clone(),
            mentions: parse_mentions(&msg.content),
            reactions: msg
                .reactions
                .iter()
                .map(|(emoji, users)| ReactionCount {
                    emoji: emoji.clone(),
                    count: users.len() as u64,
                    me: users.contains(&self.self_id),
                })
                .collect(),
            created_at: msg.created_at,
            edited_at: msg.edited_at,
        })
    }

    async fn resolve_member(
        &self,
        _guild: GuildId,
        user: UserId,
    ) -> Result<Option<Member>, PlatformError> {
        self.check_available()?;
        Ok(self.state.lock().unwrap().members.get(&user).cloned())
    }

    async fn guild_population_size(&self, _guild: GuildId) -> Result<u64, PlatformError> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        Ok(state.population.unwrap_or(state.members.len() as u64))
    }

    async fn remove_member(
        &self,
        _guild: GuildId,
        user: UserId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        state.members.remove(&user);
        state.removed_members.push(user);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT: UserId = UserId::new(1);
    const CHANNEL: ChannelId = ChannelId::new(50);

    #[tokio::test]
    async fn reactions_aggregate_with_me_flag() {
        let platform = NullPlatform::new(BOT);
        let msg = platform.post_message(CHANNEL, "vote <@7>").await.unwrap();
        platform.add_reaction(msg, "👑").await.unwrap();
        platform.react(msg, UserId::new(2), "👑");
        platform.react(msg, UserId::new(2), "👑");
        platform.react(msg, UserId::new(3), "👑");

        let snap = platform.fetch_message(msg).await.unwrap();
        assert_eq!(snap.mentions, vec![UserId::new(7)]);
        assert_eq!(snap.reactions.len(), 1);
        assert_eq!(snap.reactions[0].count, 3);
        assert!(snap.reactions[0].me);
        assert_eq!(snap.votes_for("👑"), 2);
    }

    #[tokio::test]
    async fn removing_reaction_drops_reactor() {
        let platform = NullPlatform::new(BOT);
        let msg = platform.post_message(CHANNEL, "x").await.unwrap();
        platform.react(msg, UserId::new(2), "👑");
        platform
            .remove_reaction(msg, UserId::new(2), "👑")
            .await
            .unwrap();
        assert!(platform.reactors(msg, "👑").is_empty());
        assert!(platform.fetch_message(msg).await.unwrap().reactions.is_empty());
    }

    #[tokio::test]
    async fn missing_messages_report_not_found() {
        let platform = NullPlatform::new(BOT);
        let msg = platform.post_message(CHANNEL, "x").await.unwrap();
        platform.vanish(msg);
        assert!(matches!(
            platform.fetch_message(msg).await,
            Err(PlatformError::NotFound(r)) if r == msg
        ));
        assert!(platform.edit_message(msg, "y").await.is_err());
    }

    #[tokio::test]
    async fn edits_are_timestamped() {
        let clock = Arc::new(NullClock::new(100));
        let platform = NullPlatform::with_clock(BOT, Arc::clone(&clock));
        let msg = platform.post_message(CHANNEL, "x").await.unwrap();
        clock.advance(50);
        platform.edit_message(msg, "y").await.unwrap();
        let snap = platform.fetch_message(msg).await.unwrap();
        assert_eq!(snap.created_at, Timestamp::new(100));
        assert_eq!(snap.edited_at, Some(Timestamp::new(150)));
        assert_eq!(snap.content, "y");
    }

    #[tokio::test]
    async fn population_defaults_to_member_count() {
        let platform = NullPlatform::new(BOT);
        platform.add_member(UserId::new(2), "ada");
        platform.add_member(UserId::new(3), "bob");
        let guild = GuildId::new(9);
        assert_eq!(platform.guild_population_size(guild).await.unwrap(), 2);
        platform.set_population(400);
        assert_eq!(platform.guild_population_size(guild).await.unwrap(), 400);
    }

    #[tokio::test]
    async fn unavailable_platform_fails_every_call() {
        let platform = NullPlatform::new(BOT);
        platform.set_unavailable(true);
        assert!(matches!(
            platform.post_message(CHANNEL, "x").await,
            Err(PlatformError::Unavailable(_))
        ));
    }
}
