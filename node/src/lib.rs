//! Coop governance engine.
//!
//! The engine runs periodic election cycles and ad-hoc sacrifice ballots for
//! a chat community:
//! - Derives the election cycle state from the clock on every tick and
//!   converges to it (start, commentate, end, idle refresh)
//! - Ingests votes, one per voter per cycle
//! - Ranks candidates by the live reaction counts on their campaign surfaces
//! - Resolves sacrifice ballots against population-relative thresholds
//!
//! All external systems sit behind traits: [`coop_messages::MessagingPlatform`],
//! [`coop_store::BallotStore`], [`coop_store::ConfigStore`] and
//! [`coop_types::Clock`].

pub mod campaign_cache;
pub mod candidacy;
pub mod config;
pub mod cycle_state;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod pacer;
pub mod reconciler;
pub mod resolved;
pub mod sacrifice;
pub mod shutdown;
pub mod status;
pub mod tracing_spans;

pub use campaign_cache::CampaignCache;
pub use candidacy::{Candidacy, CandidacyOutcome};
pub use config::EngineConfig;
pub use cycle_state::{CycleStateRepo, ElectionResults};
pub use engine::{CoopEngine, ReactionHandled};
pub use error::{ErrorClass, NodeError};
pub use ingest::{IngestOutcome, VoteIngestor};
pub use logging::{init_logging, LogFormat};
pub use metrics::EngineMetrics;
pub use pacer::Pacer;
pub use reconciler::{ElectionReconciler, ReconcilerSettings};
pub use resolved::ResolvedBallots;
pub use sacrifice::{SacrificeService, SacrificeSettings};
pub use shutdown::{ShutdownController, ShutdownReason, ShutdownSignal};
pub use status::StatusBoard;
