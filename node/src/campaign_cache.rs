//! Paced fetching of candidates' campaign surfaces.
//!
//! Live reaction counts on the campaign surfaces are the authoritative tally.
//! Fetching them also keeps the messages warm on the platform side so they
//! stay reactable after a restart.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use coop_governance::TallyEntry;
use coop_messages::{MessageSnapshot, MessagingPlatform};
use coop_types::{Candidate, UserId};
use tracing::Instrument;

use crate::metrics::EngineMetrics;
use crate::pacer::Pacer;
use crate::tracing_spans::campaign_refresh_span;

pub struct CampaignCache {
    platform: Arc<dyn MessagingPlatform>,
    pacer: Arc<Pacer>,
    metrics: Arc<EngineMetrics>,
    vote_emoji: String,
    /// Last successful snapshot per candidate.
    snapshots: Mutex<HashMap<UserId, MessageSnapshot>>,
}

impl CampaignCache {
    pub fn new(
        platform: Arc<dyn MessagingPlatform>,
        pacer: Arc<Pacer>,
        metrics: Arc<EngineMetrics>,
        vote_emoji: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            pacer,
            metrics,
            vote_emoji: vote_emoji.into(),
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch every candidate's surface, one paced call at a time.
    ///
    /// The result lines up with `candidates`; a surface that cannot be
    /// fetched yields `None` and the batch carries on.
    pub async fn refresh_all(&self, candidates: &[Candidate]) -> Vec<Option<MessageSnapshot>> {
        let started = tokio::time::Instant::now();
        let refreshed = async {
            let mut surfaces = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                self.pacer.ready().await;
                match self.platform.fetch_message(candidate.ballot).await {
                    Ok(snapshot) => {
                        self.snapshots
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .insert(candidate.candidate_id, snapshot.clone());
                        surfaces.push(Some(snapshot));
                    }
                    Err(e) => {
                        tracing::warn!(
                            candidate = %candidate.candidate_id,
                            surface = %candidate.ballot,
                            error = %e,
                            "campaign surface unavailable, counting zero votes"
                        );
                        self.forget(candidate.candidate_id);
                        surfaces.push(None);
                    }
                }
            }
            surfaces
        }
        .instrument(campaign_refresh_span(candidates.len()))
        .await;

        self.metrics
            .campaign_refresh_ms
            .observe(started.elapsed().as_secs_f64() * 1000.0);
        refreshed
    }

    /// Live vote counts in registration order.
    pub async fn tally(&self, candidates: &[Candidate]) -> Vec<TallyEntry> {
        let surfaces = self.refresh_all(candidates).await;
        candidates
            .iter()
            .zip(surfaces)
            .map(|(candidate, surface)| TallyEntry {
                candidate_id: candidate.candidate_id,
                votes: surface.map_or(0, |s| s.votes_for(&self.vote_emoji)),
            })
            .collect()
    }

    /// The last snapshot fetched for `candidate`.
    pub fn cached(&self, candidate: UserId) -> Option<MessageSnapshot> {
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&candidate)
            .cloned()
    }

    pub fn forget(&self, candidate: UserId) {
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&candidate);
    }

    pub fn clear(&self) {
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coop_nullables::NullPlatform;
    use coop_types::{ChannelId, Timestamp};
    use std::time::Duration;

    const BOT: UserId = UserId::new(1);
    const ELECTION: ChannelId = ChannelId::new(100);

    async fn stand(platform: &NullPlatform, id: u64) -> Candidate {
        let ballot = platform
            .post_message(ELECTION, &format!("vote {}", UserId::new(id).mention()))
            .await
            .unwrap();
        platform.add_reaction(ballot, "👑").await.unwrap();
        Candidate {
            candidate_id: UserId::new(id),
            ballot,
            registered_at: Timestamp::new(id),
        }
    }

    fn cache(platform: Arc<NullPlatform>, gap_ms: u64) -> CampaignCache {
        CampaignCache::new(
            platform,
            Arc::new(Pacer::new(Duration::from_millis(gap_ms))),
            Arc::new(EngineMetrics::new()),
            "👑",
        )
    }

    #[tokio::test(start_paused = true)]
    async fn vanished_surface_yields_none_without_aborting() {
        let platform = Arc::new(NullPlatform::new(BOT));
        let a = stand(&platform, 10).await;
        let b = stand(&platform, 20).await;
        let c = stand(&platform, 30).await;
        platform.vanish(b.ballot);

        let cache = cache(platform.clone(), 666);
        let surfaces = cache.refresh_all(&[a.clone(), b.clone(), c.clone()]).await;
        assert!(surfaces[0].is_some());
        assert!(surfaces[1].is_none());
        assert!(surfaces[2].is_some());
        assert!(cache.cached(a.candidate_id).is_some());
        assert!(cache.cached(b.candidate_id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_are_staggered_by_the_pacer() {
        let platform = Arc::new(NullPlatform::new(BOT));
        let mut candidates = Vec::new();
        for id in 1..=4 {
            candidates.push(stand(&platform, id * 10).await);
        }
        let cache = cache(platform.clone(), 666);
        let started = tokio::time::Instant::now();
        cache.refresh_all(&candidates).await;
        assert_eq!(started.elapsed(), Duration::from_millis(3 * 666));
        assert_eq!(platform.fetch_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn tally_excludes_seed_reaction_and_keeps_order() {
        let platform = Arc::new(NullPlatform::new(BOT));
        let a = stand(&platform, 10).await;
        let b = stand(&platform, 20).await;
        for voter in 100..103 {
            platform.react(b.ballot, UserId::new(voter), "👑");
        }
        platform.react(a.ballot, UserId::new(200), "👑");
        platform.react(a.ballot, UserId::new(201), "🥚");
        platform.vanish(a.ballot);

        let cache = cache(platform, 0);
        let tally = cache.tally(&[a, b]).await;
        assert_eq!(
            tally,
            vec![
                TallyEntry {
                    candidate_id: UserId::new(10),
                    votes: 0
                },
                TallyEntry {
                    candidate_id: UserId::new(20),
                    votes: 3
                },
            ]
        );
    }
}
