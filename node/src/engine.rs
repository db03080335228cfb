//! The engine: wires the governance services to their collaborators and runs
//! the reconciler on a fixed tick.

use std::sync::Arc;
use std::time::Duration;

use coop_governance::SacrificeOutcome;
use coop_messages::{MessagingPlatform, ReactionEvent};
use coop_store::{BallotStore, ConfigStore};
use coop_types::Clock;
use tokio::task::JoinHandle;

use crate::campaign_cache::CampaignCache;
use crate::candidacy::Candidacy;
use crate::config::EngineConfig;
use crate::cycle_state::CycleStateRepo;
use crate::ingest::{IngestOutcome, VoteIngestor};
use crate::metrics::EngineMetrics;
use crate::pacer::Pacer;
use crate::reconciler::{ElectionReconciler, ReconcilerSettings};
use crate::sacrifice::{SacrificeService, SacrificeSettings};
use crate::shutdown::{ShutdownController, ShutdownReason};
use crate::status::StatusBoard;
use crate::NodeError;

/// Timeout for waiting on background tasks during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// What one reaction event did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReactionHandled {
    pub vote: Option<IngestOutcome>,
    pub sacrifice: Option<SacrificeOutcome>,
}

pub struct CoopEngine {
    config: EngineConfig,
    repo: Arc<CycleStateRepo>,
    reconciler: Arc<ElectionReconciler>,
    ingestor: Arc<VoteIngestor>,
    candidacy: Arc<Candidacy>,
    sacrifice: Arc<SacrificeService>,
    metrics: Arc<EngineMetrics>,
    shutdown: ShutdownController,
    task_handles: Vec<JoinHandle<()>>,
}

impl CoopEngine {
    /// Validate `config` and build every service around the given collaborators.
    pub fn new(
        config: EngineConfig,
        platform: Arc<dyn MessagingPlatform>,
        ballots: Arc<dyn BallotStore>,
        config_store: Arc<dyn ConfigStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        config.validate()?;

        let metrics = Arc::new(EngineMetrics::new());
        let pacer = Arc::new(Pacer::new(config.fetch_gap()));
        let repo = Arc::new(CycleStateRepo::new(config_store));
        let status = Arc::new(StatusBoard::new(
            Arc::clone(&platform),
            Arc::clone(&repo),
            config.feed_channel,
            config.transient_ttl(),
        ));
        let cache = Arc::new(CampaignCache::new(
            Arc::clone(&platform),
            Arc::clone(&pacer),
            Arc::clone(&metrics),
            config.vote_emoji.clone(),
        ));

        let reconciler = Arc::new(ElectionReconciler::new(
            ReconcilerSettings {
                params: config.governance.clone(),
                guild: config.guild_id,
                election_channel: config.election_channel,
                idle_refresh_secs: config.idle_refresh_secs,
            },
            Arc::clone(&platform),
            Arc::clone(&ballots),
            Arc::clone(&repo),
            Arc::clone(&status),
            cache,
            Arc::clone(&pacer),
            Arc::clone(&clock),
            Arc::clone(&metrics),
        ));
        let ingestor = Arc::new(VoteIngestor::new(
            Arc::clone(&platform),
            Arc::clone(&ballots),
            Arc::clone(&status),
            Arc::clone(&clock),
            Arc::clone(&metrics),
            config.guild_id,
            config.election_channel,
            config.vote_emoji.clone(),
        ));
        let candidacy = Arc::new(Candidacy::new(
            Arc::clone(&platform),
            ballots,
            Arc::clone(&repo),
            clock,
            Arc::clone(&metrics),
            config.election_channel,
            config.vote_emoji.clone(),
        ));
        let sacrifice = Arc::new(SacrificeService::new(
            SacrificeSettings {
                params: config.governance.clone(),
                guild: config.guild_id,
                sacrifice_channel: config.sacrifice_channel,
                condemn_emoji: config.condemn_emoji.clone(),
                protect_emoji: config.protect_emoji.clone(),
                enforce: config.enforce_sacrifice,
                resolved_capacity: config.resolved_ballot_capacity,
            },
            platform,
            status,
            pacer,
            Arc::clone(&metrics),
        ));

        Ok(Self {
            config,
            repo,
            reconciler,
            ingestor,
            candidacy,
            sacrifice,
            metrics,
            shutdown: ShutdownController::new(),
            task_handles: Vec::new(),
        })
    }

    /// Warm up, start a due cycle right away, then spawn the tick loop.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        tracing::info!(
            tick_secs = self.config.tick_secs,
            guild = %self.config.guild_id,
            "Coop engine starting"
        );
        if self.repo.status_surface()?.is_none() {
            tracing::warn!("election_message_link is not set, status updates will fail");
        }

        if let Err(e) = self.reconciler.on_load().await {
            tracing::warn!(error = %e, "campaign warm-up failed");
        }
        if let Err(e) = self.reconciler.trigger_start_if_due().await {
            tracing::warn!(error = %e, "start check failed");
        }

        let reconciler = Arc::clone(&self.reconciler);
        let mut stop_signal = self.shutdown.signal();
        let period = self.config.tick_interval();
        let tick_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; startup already ran a check.
            interval.tick().await;
            loop {
                tokio::select! {
                    biased;
                    reason = stop_signal.triggered() => {
                        tracing::info!(?reason, "reconciler tick task shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        reconciler.check_progress().await;
                    }
                }
            }
        });
        self.task_handles.push(tick_handle);
        Ok(())
    }

    /// Dispatch a reaction to the election and sacrifice flows. Each flow
    /// filters for its own channel and emoji.
    pub async fn handle_reaction(&self, event: &ReactionEvent) -> ReactionHandled {
        ReactionHandled {
            vote: self.ingestor.on_reaction(event).await,
            sacrifice: self.sacrifice.on_reaction(event).await,
        }
    }

    /// Signal every task and wait for them (bounded).
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!("Coop engine stopping");
        self.shutdown.trigger(ShutdownReason::Requested);

        let handles: Vec<JoinHandle<()>> = self.task_handles.drain(..).collect();
        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all)
            .await
            .is_err()
        {
            tracing::warn!(
                "shutdown timeout ({:?}), some tasks may still be running",
                SHUTDOWN_TIMEOUT
            );
        }
        tracing::info!("Coop engine stopped");
        Ok(())
    }

    /// Run until SIGINT/SIGTERM, then stop.
    pub async fn run_until_signal(&mut self) -> Result<(), NodeError> {
        self.start().await?;
        self.shutdown.wait_for_os_signal().await;
        self.stop().await
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn reconciler(&self) -> &Arc<ElectionReconciler> {
        &self.reconciler
    }

    pub fn candidacy(&self) -> &Arc<Candidacy> {
        &self.candidacy
    }

    pub fn sacrifice(&self) -> &Arc<SacrificeService> {
        &self.sacrifice
    }

    pub fn cycle_state(&self) -> &Arc<CycleStateRepo> {
        &self.repo
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }
}
