//! Election vote ingestion.
//!
//! A vote is a `vote_emoji` reaction on a candidate's campaign surface. The
//! ballot store enforces one vote per voter per cycle; the live reaction is
//! what gets counted, so a rejected second vote also has its reaction
//! withdrawn.

use std::sync::Arc;

use coop_messages::{MessagingPlatform, ReactionEvent};
use coop_store::{BallotStore, StoreError};
use coop_types::{ChannelId, Clock, GuildId, MessageRef, UserId};
use tracing::Instrument;

use crate::metrics::EngineMetrics;
use crate::status::StatusBoard;
use crate::tracing_spans::ballot_ingest_span;
use crate::NodeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    Accepted { candidate: UserId },
    /// `previous` is who the voter picked first, if the record could be read.
    AlreadyVoted { previous: Option<UserId> },
    NotACandidate,
}

pub struct VoteIngestor {
    platform: Arc<dyn MessagingPlatform>,
    ballots: Arc<dyn BallotStore>,
    status: Arc<StatusBoard>,
    clock: Arc<dyn Clock>,
    metrics: Arc<EngineMetrics>,
    guild: GuildId,
    election_channel: ChannelId,
    vote_emoji: String,
}

impl VoteIngestor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        platform: Arc<dyn MessagingPlatform>,
        ballots: Arc<dyn BallotStore>,
        status: Arc<StatusBoard>,
        clock: Arc<dyn Clock>,
        metrics: Arc<EngineMetrics>,
        guild: GuildId,
        election_channel: ChannelId,
        vote_emoji: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            ballots,
            status,
            clock,
            metrics,
            guild,
            election_channel,
            vote_emoji: vote_emoji.into(),
        }
    }

    /// Whether `event` is an election vote at all.
    pub fn is_vote(&self, event: &ReactionEvent) -> bool {
        event.message.channel == self.election_channel
            && event.user != self.platform.self_id()
            && event.emoji == self.vote_emoji
    }

    /// Entry point for reaction events. Anything that is not a vote returns
    /// `None`; failures are logged and also return `None`.
    pub async fn on_reaction(&self, event: &ReactionEvent) -> Option<IngestOutcome> {
        if !self.is_vote(event) {
            return None;
        }
        let span = ballot_ingest_span(event.user, event.message);
        match self.ingest(event.user, event.message).instrument(span).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!(
                    voter = %event.user,
                    surface = %event.message,
                    error = %e,
                    class = ?e.classify(),
                    "could not process election vote"
                );
                None
            }
        }
    }

    /// Record `voter`'s vote cast on `surface`.
    pub async fn ingest(
        &self,
        voter: UserId,
        surface: MessageRef,
    ) -> Result<IngestOutcome, NodeError> {
        let Some(candidate) = self.ballots.find_candidate_by_surface(surface)? else {
            return Ok(IngestOutcome::NotACandidate);
        };

        match self
            .ballots
            .insert_vote(voter, candidate.candidate_id, self.clock.now())
        {
            Ok(()) => {
                self.metrics.votes_accepted.inc();
                tracing::info!(voter = %voter, candidate = %candidate.candidate_id, "vote accepted");
                let text = format!(
                    "{} cast their vote for {}!",
                    self.display_name(voter).await,
                    self.display_name(candidate.candidate_id).await
                );
                self.status.post_feed(&text).await;
                Ok(IngestOutcome::Accepted {
                    candidate: candidate.candidate_id,
                })
            }
            Err(StoreError::DuplicateVoter(_)) => {
                self.metrics.votes_rejected.inc();
                let previous = self
                    .ballots
                    .find_vote_by_voter(voter)?
                    .map(|v| v.candidate_id);
                tracing::info!(voter = %voter, previous = ?previous, "second vote rejected");
                self.reject_duplicate(voter, surface, previous).await;
                Ok(IngestOutcome::AlreadyVoted { previous })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Withdraw the duplicate reaction so the live tally never sees it, and
    /// tell the voter briefly.
    async fn reject_duplicate(&self, voter: UserId, surface: MessageRef, previous: Option<UserId>) {
        if let Err(e) = self
            .platform
            .remove_reaction(surface, voter, &self.vote_emoji)
            .await
        {
            tracing::warn!(voter = %voter, surface = %surface, error = %e, "could not retract duplicate vote");
        }
        let previous = match previous {
            Some(id) => self.display_name(id).await,
            None => "someone".to_string(),
        };
        let text = format!(
            "{} you already voted for {previous}, you cheeky fluck.",
            voter.mention()
        );
        self.status.post_transient(self.election_channel, &text).await;
    }

    /// Username if the member resolves, otherwise a mention.
    async fn display_name(&self, user: UserId) -> String {
        match self.platform.resolve_member(self.guild, user).await {
            Ok(Some(member)) => member.username,
            _ => user.mention(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle_state::CycleStateRepo;
    use coop_nullables::{NullBallotStore, NullClock, NullConfigStore, NullPlatform};
    use coop_types::Timestamp;
    use std::time::Duration;

    const BOT: UserId = UserId::new(1);
    const GUILD: GuildId = GuildId::new(9);
    const ELECTION: ChannelId = ChannelId::new(100);
    const FEED: ChannelId = ChannelId::new(200);

    struct Fixture {
        platform: Arc<NullPlatform>,
        ballots: Arc<NullBallotStore>,
        ingestor: Arc<VoteIngestor>,
        surface: MessageRef,
    }

    async fn fixture() -> Fixture {
        let clock = Arc::new(NullClock::new(1_000));
        let platform = Arc::new(NullPlatform::with_clock(BOT, clock.clone()));
        platform.add_member(UserId::new(10), "ada");
        platform.add_member(UserId::new(20), "bob");
        platform.add_member(UserId::new(5), "voter");
        let ballots = Arc::new(NullBallotStore::new());
        let repo = Arc::new(CycleStateRepo::new(Arc::new(NullConfigStore::new())));
        let status = Arc::new(StatusBoard::new(
            platform.clone(),
            repo,
            FEED,
            Duration::from_secs(3),
        ));
        let surface = platform.post_message(ELECTION, "vote <@10>").await.unwrap();
        ballots
            .insert_candidate(UserId::new(10), surface, Timestamp::new(1))
            .unwrap();
        let ingestor = Arc::new(VoteIngestor::new(
            platform.clone(),
            ballots.clone(),
            status,
            clock,
            Arc::new(EngineMetrics::new()),
            GUILD,
            ELECTION,
            "👑",
        ));
        Fixture {
            platform,
            ballots,
            ingestor,
            surface,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_vote_is_accepted_and_acknowledged() {
        let f = fixture().await;
        let event = f.platform.react(f.surface, UserId::new(5), "👑");
        assert_eq!(
            f.ingestor.on_reaction(&event).await,
            Some(IngestOutcome::Accepted {
                candidate: UserId::new(10)
            })
        );
        assert!(f
            .platform
            .channel_contents(FEED)
            .contains(&"voter cast their vote for ada!".to_string()));
        let vote = f.ballots.find_vote_by_voter(UserId::new(5)).unwrap().unwrap();
        assert_eq!(vote.cast_at, Timestamp::new(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn second_vote_is_retracted() {
        let f = fixture().await;
        let other = f.platform.post_message(ELECTION, "vote <@20>").await.unwrap();
        f.ballots
            .insert_candidate(UserId::new(20), other, Timestamp::new(2))
            .unwrap();

        let first = f.platform.react(f.surface, UserId::new(5), "👑");
        f.ingestor.on_reaction(&first).await;
        let second = f.platform.react(other, UserId::new(5), "👑");
        assert_eq!(
            f.ingestor.on_reaction(&second).await,
            Some(IngestOutcome::AlreadyVoted {
                previous: Some(UserId::new(10))
            })
        );
        assert!(f.platform.reactors(other, "👑").is_empty());
        assert_eq!(f.platform.reactors(f.surface, "👑"), vec![UserId::new(5)]);
        assert!(f
            .platform
            .channel_contents(ELECTION)
            .iter()
            .any(|t| t.contains("you already voted for ada")));
    }

    #[tokio::test]
    async fn reactions_elsewhere_are_ignored() {
        let f = fixture().await;
        let wrong_emoji = f.platform.react(f.surface, UserId::new(5), "🥚");
        assert_eq!(f.ingestor.on_reaction(&wrong_emoji).await, None);
        let own_seed = f.platform.react(f.surface, BOT, "👑");
        assert_eq!(f.ingestor.on_reaction(&own_seed).await, None);
        let stray = f
            .platform
            .post_message(ChannelId::new(300), "<@10>")
            .await
            .unwrap();
        let elsewhere = f.platform.react(stray, UserId::new(5), "👑");
        assert_eq!(f.ingestor.on_reaction(&elsewhere).await, None);
        assert!(f.ballots.list_votes().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_campaign_surface_is_not_a_candidate() {
        let f = fixture().await;
        let status = f.platform.post_message(ELECTION, "status").await.unwrap();
        let event = f.platform.react(status, UserId::new(5), "👑");
        assert_eq!(
            f.ingestor.on_reaction(&event).await,
            Some(IngestOutcome::NotACandidate)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_votes_from_one_voter_accept_exactly_once() {
        let f = fixture().await;
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ingestor = Arc::clone(&f.ingestor);
            let surface = f.surface;
            handles.push(tokio::spawn(async move {
                ingestor.ingest(UserId::new(5), surface).await.unwrap()
            }));
        }
        let mut accepted = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), IngestOutcome::Accepted { .. }) {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(f.ballots.list_votes().unwrap().len(), 1);
    }
}
