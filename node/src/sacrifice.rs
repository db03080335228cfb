//! Sacrifice ballots: the community votes to condemn or protect a member.
//!
//! A ballot is a message in the sacrifice channel mentioning its target.
//! Nothing about it is stored; each reaction re-reads the surface's counts
//! and re-evaluates. Once a surface resolves, later reactions on it are inert.

use std::sync::{Arc, Mutex};

use coop_governance::{
    BallotSide, GovernanceParams, SacrificeCounts, SacrificeOutcome, SacrificeThresholds,
};
use coop_messages::{MessagingPlatform, ReactionEvent};
use coop_types::{ChannelId, GuildId, MessageRef, UserId};
use tracing::Instrument;

use crate::metrics::EngineMetrics;
use crate::pacer::Pacer;
use crate::resolved::ResolvedBallots;
use crate::status::StatusBoard;
use crate::tracing_spans::sacrifice_resolve_span;
use crate::NodeError;

#[derive(Clone, Debug)]
pub struct SacrificeSettings {
    pub params: GovernanceParams,
    pub guild: GuildId,
    pub sacrifice_channel: ChannelId,
    pub condemn_emoji: String,
    pub protect_emoji: String,
    /// Remove condemned members instead of only announcing the verdict.
    pub enforce: bool,
    pub resolved_capacity: usize,
}

pub struct SacrificeService {
    settings: SacrificeSettings,
    platform: Arc<dyn MessagingPlatform>,
    status: Arc<StatusBoard>,
    pacer: Arc<Pacer>,
    metrics: Arc<EngineMetrics>,
    resolved: Mutex<ResolvedBallots>,
}

impl SacrificeService {
    pub fn new(
        settings: SacrificeSettings,
        platform: Arc<dyn MessagingPlatform>,
        status: Arc<StatusBoard>,
        pacer: Arc<Pacer>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        let resolved = Mutex::new(ResolvedBallots::new(settings.resolved_capacity));
        Self {
            settings,
            platform,
            status,
            pacer,
            metrics,
            resolved,
        }
    }

    fn side_of(&self, emoji: &str) -> Option<BallotSide> {
        if emoji == self.settings.condemn_emoji {
            Some(BallotSide::Condemn)
        } else if emoji == self.settings.protect_emoji {
            Some(BallotSide::Protect)
        } else {
            None
        }
    }

    fn is_resolved(&self, surface: &MessageRef) -> bool {
        self.resolved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(surface)
    }

    /// Entry point for reaction events. Returns the evaluation, or `None`
    /// when the event is not a sacrifice vote, the ballot already resolved,
    /// or evaluation failed (logged).
    pub async fn on_reaction(&self, event: &ReactionEvent) -> Option<SacrificeOutcome> {
        if event.user_is_bot || event.message.channel != self.settings.sacrifice_channel {
            return None;
        }
        let trigger = self.side_of(&event.emoji)?;
        let span = sacrifice_resolve_span(event.message, &event.emoji);
        match self.process(event.message, trigger).instrument(span).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    surface = %event.message,
                    error = %e,
                    class = ?e.classify(),
                    "could not process sacrifice vote"
                );
                None
            }
        }
    }

    /// Re-evaluate the ballot on `surface` after a `trigger` vote.
    pub async fn process(
        &self,
        surface: MessageRef,
        trigger: BallotSide,
    ) -> Result<Option<SacrificeOutcome>, NodeError> {
        if self.is_resolved(&surface) {
            tracing::debug!(surface = %surface, "ballot already resolved");
            return Ok(None);
        }

        let snapshot = self
            .platform
            .fetch_message(surface)
            .await
            .map_err(|e| NodeError::from_surface(surface, e))?;
        if snapshot.author != self.platform.self_id() {
            tracing::debug!(surface = %surface, author = %snapshot.author, "not a ballot the engine opened");
            return Ok(None);
        }
        let Some(&target) = snapshot.mentions.first() else {
            tracing::debug!(surface = %surface, "no target mentioned, not a ballot");
            return Ok(None);
        };
        if self
            .platform
            .resolve_member(self.settings.guild, target)
            .await?
            .is_none()
        {
            return Err(NodeError::InvalidTarget(target));
        }

        let population = self
            .platform
            .guild_population_size(self.settings.guild)
            .await?;
        let thresholds = SacrificeThresholds::for_population(population, &self.settings.params);
        let counts = SacrificeCounts {
            condemn: snapshot.votes_for(&self.settings.condemn_emoji),
            protect: snapshot.votes_for(&self.settings.protect_emoji),
        };
        let outcome = SacrificeOutcome::resolve(counts, thresholds, trigger);
        tracing::debug!(target = %target, ?counts, ?thresholds, ?outcome, "sacrifice ballot evaluated");

        if outcome.is_resolved()
            && !self
                .resolved
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .claim(surface)
        {
            return Ok(None);
        }

        match outcome {
            SacrificeOutcome::Condemned => self.condemn(target).await,
            SacrificeOutcome::Protected => {
                self.metrics.sacrifices_protected.inc();
                tracing::info!(target = %target, "member protected from sacrifice");
                self.status
                    .post_feed(&format!(
                        "{} was protected from sacrifice by votes!",
                        target.mention()
                    ))
                    .await;
            }
            SacrificeOutcome::Pending {
                remaining_protect,
                remaining_condemn,
            } => {
                self.status
                    .post_feed(&format!(
                        "{}'s sacrifice was voted upon!\n\n**Remaining Votes:**\nTo Protect: {}: {}\nTo Sacrifice: {}: {}",
                        target.mention(),
                        self.settings.protect_emoji,
                        remaining_protect,
                        self.settings.condemn_emoji,
                        remaining_condemn
                    ))
                    .await;
            }
        }
        Ok(Some(outcome))
    }

    async fn condemn(&self, target: UserId) {
        self.metrics.sacrifices_condemned.inc();
        tracing::info!(target = %target, enforce = self.settings.enforce, "member condemned");
        self.status
            .post_feed(&format!("{} was sacrificed!", target.mention()))
            .await;

        if !self.settings.enforce {
            self.status
                .post_feed("Enforcement is off, the member stays in the guild.")
                .await;
            return;
        }
        if let Err(e) = self
            .platform
            .remove_member(self.settings.guild, target, "sacrificed by community vote")
            .await
        {
            tracing::warn!(target = %target, error = %e, "could not remove condemned member");
        }
    }

    /// Open a ballot on `target`: post the surface, announce it in the feed
    /// and seed both reactions through the pacer.
    pub async fn offer(&self, target: UserId) -> Result<MessageRef, NodeError> {
        let member = self
            .platform
            .resolve_member(self.settings.guild, target)
            .await?
            .ok_or(NodeError::InvalidTarget(target))?;

        let text = format!(
            "**{}, you are being considered for sacrifice!**\n\nTo sacrifice {} press {}, to protect the user press {}.",
            member.username,
            target.mention(),
            self.settings.condemn_emoji,
            self.settings.protect_emoji
        );
        let surface = self
            .platform
            .post_message(self.settings.sacrifice_channel, &text)
            .await?;
        tracing::info!(target = %target, surface = %surface, "sacrifice ballot opened");

        self.status
            .post_feed(&format!(
                "{} is being considered for sacrifice! Vote now! {}",
                target.mention(),
                surface.link(self.settings.guild)
            ))
            .await;

        for emoji in [&self.settings.condemn_emoji, &self.settings.protect_emoji] {
            self.pacer.ready().await;
            if let Err(e) = self.platform.add_reaction(surface, emoji).await {
                tracing::warn!(surface = %surface, emoji = %emoji, error = %e, "could not seed ballot");
            }
        }
        Ok(surface)
    }
}
