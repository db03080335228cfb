//! The election control loop.
//!
//! Every tick derives the desired cycle state from the wall clock and the
//! persisted state, then runs the single action that converges the two (see
//! [`coop_governance::decide`]). Actions are safe to repeat: a failed tick
//! leaves state where the next tick can pick it up.

use std::sync::Arc;

use coop_governance::{decide, CycleAction, CycleWindow, GovernanceParams, Hierarchy};
use coop_messages::{MessagingPlatform, PlatformError};
use coop_store::BallotStore;
use coop_types::{ChannelId, Clock, ElectionCycleState, GuildId, Timestamp};
use coop_utils::{format_calendar, humanize_secs};
use tracing::Instrument;

use crate::campaign_cache::CampaignCache;
use crate::cycle_state::CycleStateRepo;
use crate::metrics::EngineMetrics;
use crate::pacer::Pacer;
use crate::status::StatusBoard;
use crate::tracing_spans::reconcile_tick_span;
use crate::NodeError;

/// Static settings of the reconciler.
#[derive(Clone, Debug)]
pub struct ReconcilerSettings {
    pub params: GovernanceParams,
    pub guild: GuildId,
    pub election_channel: ChannelId,
    /// An idle status surface older than this is rewritten.
    pub idle_refresh_secs: u64,
}

pub struct ElectionReconciler {
    settings: ReconcilerSettings,
    platform: Arc<dyn MessagingPlatform>,
    ballots: Arc<dyn BallotStore>,
    repo: Arc<CycleStateRepo>,
    status: Arc<StatusBoard>,
    cache: Arc<CampaignCache>,
    pacer: Arc<Pacer>,
    clock: Arc<dyn Clock>,
    metrics: Arc<EngineMetrics>,
    /// One tick at a time.
    tick_guard: tokio::sync::Mutex<()>,
}

impl ElectionReconciler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: ReconcilerSettings,
        platform: Arc<dyn MessagingPlatform>,
        ballots: Arc<dyn BallotStore>,
        repo: Arc<CycleStateRepo>,
        status: Arc<StatusBoard>,
        cache: Arc<CampaignCache>,
        pacer: Arc<Pacer>,
        clock: Arc<dyn Clock>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            settings,
            platform,
            ballots,
            repo,
            status,
            cache,
            pacer,
            clock,
            metrics,
            tick_guard: tokio::sync::Mutex::new(()),
        }
    }

    fn params(&self) -> &GovernanceParams {
        &self.settings.params
    }

    /// Run one tick. Never fails: errors are logged and counted, and the
    /// action that was attempted is returned either way.
    pub async fn check_progress(&self) -> Option<CycleAction> {
        let _tick = self.tick_guard.lock().await;
        let now = self.clock.now();
        self.metrics.ticks.inc();

        let (action, result) = self
            .run_tick(now)
            .instrument(reconcile_tick_span(now.as_secs()))
            .await;

        if let Err(e) = result {
            self.metrics.tick_failures.inc();
            tracing::warn!(
                action = action.map_or("load", |a| a.name()),
                error = %e,
                class = ?e.classify(),
                "election tick failed, retrying next tick"
            );
        }
        action
    }

    async fn run_tick(&self, now: Timestamp) -> (Option<CycleAction>, Result<(), NodeError>) {
        let state = match self.repo.load() {
            Ok(state) => state,
            Err(e) => return (None, Err(e)),
        };
        let action = decide(now, &state, self.params());
        tracing::debug!(
            action = action.name(),
            is_on = state.is_on,
            last_started_at = %state.last_started_at,
            "tick"
        );
        (Some(action), self.execute(action, state, now).await)
    }

    async fn execute(
        &self,
        action: CycleAction,
        state: ElectionCycleState,
        now: Timestamp,
    ) -> Result<(), NodeError> {
        match action {
            CycleAction::Start { .. } => self.start(action.next_state(state), now).await,
            CycleAction::End => self.end(action.next_state(state), now).await,
            CycleAction::Commentate => self.commentate(state, now).await,
            CycleAction::Idle => self.idle(state, now).await,
        }
    }

    async fn start(&self, started: ElectionCycleState, now: Timestamp) -> Result<(), NodeError> {
        self.status.post_feed("Starting the election...").await;
        self.repo.save(&started)?;
        self.metrics.cycles_started.inc();
        tracing::info!(anchor = %started.last_started_at, "election started");

        let remaining = self.window(started).remaining_secs(now);
        self.status
            .publish_status(&format!(
                "The election is currently ongoing! Time remaining: {}",
                humanize_secs(remaining)
            ))
            .await
    }

    async fn commentate(&self, state: ElectionCycleState, now: Timestamp) -> Result<(), NodeError> {
        let remaining = humanize_secs(self.window(state).remaining_secs(now));
        let hierarchy = self.current_hierarchy().await?;

        self.status
            .post_feed(&format!(
                "{} is running and has {remaining} remaining!",
                self.settings.election_channel.mention()
            ))
            .await;

        let mut text = format!(
            "The election is still running for {remaining}, here is current information:\n\n"
        );
        match hierarchy {
            Some(h) => text.push_str(&render_hierarchy(&h)),
            None => text.push_str("Nobody is standing yet."),
        }
        self.status.publish_status(&text).await
    }

    async fn end(&self, ended: ElectionCycleState, now: Timestamp) -> Result<(), NodeError> {
        let cycle = ended.last_started_at;
        let hierarchy = self.current_hierarchy().await?;
        tracing::info!(winner = ?hierarchy.as_ref().map(|h| h.commander.candidate_id), "ending the election");
        self.status.post_feed("Ending the election...").await;

        match &hierarchy {
            Some(h) => {
                self.repo.record_results(h, cycle)?;
                self.status
                    .post_feed(&format!("**The election is over!**\n\n{}", render_hierarchy(h)))
                    .await;
            }
            None => {
                // A retry that finds the candidates already cleared keeps the
                // results this cycle recorded.
                let recorded = self
                    .repo
                    .last_results()?
                    .is_some_and(|r| r.cycle == cycle);
                if !recorded {
                    self.repo.clear_results()?;
                    self.status
                        .post_feed("The election ended without any candidates.")
                        .await;
                }
            }
        }

        self.clear_election().await?;
        self.repo.save(&ended)?;
        self.metrics.cycles_ended.inc();

        self.status.publish_status(&self.idle_text(ended, now)?).await
    }

    async fn idle(&self, state: ElectionCycleState, now: Timestamp) -> Result<(), NodeError> {
        let touched = self.status.status_last_touched().await?;
        if touched.elapsed_since(now) < self.settings.idle_refresh_secs {
            return Ok(());
        }
        self.status.publish_status(&self.idle_text(state, now)?).await
    }

    fn idle_text(&self, state: ElectionCycleState, now: Timestamp) -> Result<String, NodeError> {
        let next = self.window(state).next_start;
        let members = match self.repo.last_results()? {
            Some(results) => {
                let mut text = format!(
                    "Elected {}:\nCommander: {}",
                    format_calendar(results.cycle),
                    results.commander.mention()
                );
                for leader in &results.leaders {
                    text.push_str(&format!("\nLeader: {}", leader.mention()));
                }
                text
            }
            None => "None yet.".to_string(),
        };
        Ok(format!(
            "**Election is over.**\n\nYour current elected members:\n{members}\n\nNext Election: {} ({})",
            format_calendar(next),
            humanize_secs(next.as_secs().saturating_sub(now.as_secs()))
        ))
    }

    /// Rank the current candidates by their live vote counts.
    async fn current_hierarchy(&self) -> Result<Option<Hierarchy>, NodeError> {
        let candidates = self.ballots.list_candidates()?;
        self.metrics.candidates.set(candidates.len() as i64);
        if candidates.is_empty() {
            return Ok(None);
        }
        let population = self
            .platform
            .guild_population_size(self.settings.guild)
            .await?;
        let tally = self.cache.tally(&candidates).await;
        Ok(Hierarchy::rank(
            &tally,
            population,
            self.params().leader_fraction_bps,
        ))
    }

    fn window(&self, state: ElectionCycleState) -> CycleWindow {
        CycleWindow::anchored(state.last_started_at, self.params())
    }

    /// Delete every vote and candidate, then every campaign surface (paced,
    /// best-effort). A surface is only deleted once no candidate refers to it.
    pub async fn clear_election(&self) -> Result<(), NodeError> {
        let candidates = self.ballots.list_candidates()?;
        self.ballots.delete_all_votes()?;
        self.ballots.delete_all_candidates()?;
        self.cache.clear();
        self.metrics.candidates.set(0);

        for candidate in &candidates {
            self.pacer.ready().await;
            match self.platform.delete_message(candidate.ballot).await {
                Ok(()) | Err(PlatformError::NotFound(_)) => {}
                Err(e) => tracing::warn!(
                    surface = %candidate.ballot,
                    error = %e,
                    "could not delete campaign surface"
                ),
            }
        }
        tracing::info!(candidates = candidates.len(), "election cleared");
        Ok(())
    }

    /// Startup warm-up: inside the voting window, fetch every campaign
    /// surface once so they stay reactable.
    pub async fn on_load(&self) -> Result<(), NodeError> {
        let state = self.repo.load()?;
        if self.window(state).contains(self.clock.now()) {
            let candidates = self.ballots.list_candidates()?;
            self.metrics.candidates.set(candidates.len() as i64);
            self.cache.refresh_all(&candidates).await;
            tracing::info!(candidates = candidates.len(), "cached election candidates");
        }
        Ok(())
    }

    /// Run a tick only if it would start a cycle.
    pub async fn trigger_start_if_due(&self) -> Result<Option<CycleAction>, NodeError> {
        let state = self.repo.load()?;
        match decide(self.clock.now(), &state, self.params()) {
            CycleAction::Start { .. } => Ok(self.check_progress().await),
            _ => Ok(None),
        }
    }

    /// Seconds left in the current voting window (zero outside it).
    pub fn voting_period_left_secs(&self) -> Result<u64, NodeError> {
        let state = self.repo.load()?;
        Ok(self.window(state).remaining_secs(self.clock.now()))
    }

    pub fn next_election_at(&self) -> Result<Timestamp, NodeError> {
        Ok(self.window(self.repo.load()?).next_start)
    }

    pub fn last_election_fmt(&self) -> Result<String, NodeError> {
        Ok(format_calendar(self.repo.load()?.last_started_at))
    }

    pub fn next_election_fmt(&self) -> Result<String, NodeError> {
        Ok(format_calendar(self.next_election_at()?))
    }
}

fn render_hierarchy(hierarchy: &Hierarchy) -> String {
    let mut text = format!(
        "Commander: {} ({} votes)",
        hierarchy.commander.candidate_id.mention(),
        hierarchy.commander.votes
    );
    if !hierarchy.leaders.is_empty() {
        text.push_str("\n\nLeaders:");
        for leader in &hierarchy.leaders {
            text.push_str(&format!(
                "\n{} ({} votes)",
                leader.candidate_id.mention(),
                leader.votes
            ));
        }
    }
    text
}
