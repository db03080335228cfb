//! Named [`tracing::Span`] constructors for the engine's top-level actions.
//!
//! Keeping span names and field sets in one place makes the logs of one
//! tick or one ballot easy to filter.

use coop_types::{MessageRef, UserId};
use tracing::{info_span, Span};

/// One reconciler tick, from state read to executed action.
pub fn reconcile_tick_span(now_secs: u64) -> Span {
    info_span!("reconcile_tick", now = now_secs)
}

/// One vote reaction on a campaign surface.
pub fn ballot_ingest_span(voter: UserId, surface: MessageRef) -> Span {
    info_span!("ballot_ingest", voter = %voter, surface = %surface)
}

/// One re-evaluation of a sacrifice ballot.
pub fn sacrifice_resolve_span(surface: MessageRef, emoji: &str) -> Span {
    info_span!("sacrifice_resolve", surface = %surface, emoji = %emoji)
}

/// A paced fetch of every candidate's ballot surface.
pub fn campaign_refresh_span(candidates: usize) -> Span {
    info_span!("campaign_refresh", candidates = candidates)
}
