//! Prometheus metrics for the governance engine.
//!
//! [`EngineMetrics`] owns a dedicated [`Registry`]; whoever hosts the engine
//! can expose [`EngineMetrics::encode_text`] on a scrape endpoint.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

/// Central collection of all engine-level Prometheus metrics.
pub struct EngineMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Reconciler ticks run.
    pub ticks: IntCounter,
    /// Ticks whose action failed and was left for the next tick.
    pub tick_failures: IntCounter,
    pub cycles_started: IntCounter,
    pub cycles_ended: IntCounter,
    pub votes_accepted: IntCounter,
    /// Second votes from a voter who already voted this cycle.
    pub votes_rejected: IntCounter,
    pub sacrifices_condemned: IntCounter,
    pub sacrifices_protected: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Candidates standing in the current cycle.
    pub candidates: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Wall time of one paced campaign refresh, in milliseconds.
    pub campaign_refresh_ms: Histogram,
}

impl EngineMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let ticks = register_int_counter_with_registry!(
            Opts::new("coop_reconciler_ticks_total", "Reconciler ticks run"),
            registry
        )
        .expect("failed to register ticks counter");

        let tick_failures = register_int_counter_with_registry!(
            Opts::new(
                "coop_reconciler_tick_failures_total",
                "Reconciler ticks whose action failed"
            ),
            registry
        )
        .expect("failed to register tick_failures counter");

        let cycles_started = register_int_counter_with_registry!(
            Opts::new("coop_cycles_started_total", "Election cycles started"),
            registry
        )
        .expect("failed to register cycles_started counter");

        let cycles_ended = register_int_counter_with_registry!(
            Opts::new("coop_cycles_ended_total", "Election cycles ended"),
            registry
        )
        .expect("failed to register cycles_ended counter");

        let votes_accepted = register_int_counter_with_registry!(
            Opts::new("coop_votes_accepted_total", "Election votes recorded"),
            registry
        )
        .expect("failed to register votes_accepted counter");

        let votes_rejected = register_int_counter_with_registry!(
            Opts::new(
                "coop_votes_rejected_total",
                "Election votes rejected because the voter already voted"
            ),
            registry
        )
        .expect("failed to register votes_rejected counter");

        let sacrifices_condemned = register_int_counter_with_registry!(
            Opts::new(
                "coop_sacrifices_condemned_total",
                "Sacrifice ballots resolved as condemned"
            ),
            registry
        )
        .expect("failed to register sacrifices_condemned counter");

        let sacrifices_protected = register_int_counter_with_registry!(
            Opts::new(
                "coop_sacrifices_protected_total",
                "Sacrifice ballots resolved as protected"
            ),
            registry
        )
        .expect("failed to register sacrifices_protected counter");

        let candidates = register_int_gauge_with_registry!(
            Opts::new("coop_candidates", "Candidates standing in the current cycle"),
            registry
        )
        .expect("failed to register candidates gauge");

        // 10 ms → ~80 s; a refresh is paced, so it grows with the candidate count.
        let campaign_refresh_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "coop_campaign_refresh_ms",
                "Campaign refresh time in milliseconds"
            )
            .buckets(
                prometheus::exponential_buckets(10.0, 2.0, 14)
                    .expect("static bucket layout is valid")
            ),
            registry
        )
        .expect("failed to register campaign_refresh_ms histogram");

        Self {
            registry,
            ticks,
            tick_failures,
            cycles_started,
            cycles_ended,
            votes_accepted,
            votes_rejected,
            sacrifices_condemned,
            sacrifices_protected,
            candidates,
            campaign_refresh_ms,
        }
    }

    /// Prometheus text exposition of every metric.
    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        let metrics = EngineMetrics::new();
        metrics.ticks.inc();
        metrics.ticks.inc();
        metrics.candidates.set(4);
        let text = metrics.encode_text();
        assert!(text.contains("coop_reconciler_ticks_total 2"));
        assert!(text.contains("coop_candidates 4"));
    }

    #[test]
    fn separate_instances_do_not_collide() {
        let a = EngineMetrics::new();
        let b = EngineMetrics::new();
        a.votes_accepted.inc();
        assert_eq!(a.votes_accepted.get(), 1);
        assert_eq!(b.votes_accepted.get(), 0);
    }
}
