//! Standing for election.

use std::sync::Arc;

use coop_messages::MessagingPlatform;
use coop_store::{BallotStore, StoreError};
use coop_types::{Candidate, ChannelId, Clock, UserId};

use crate::cycle_state::CycleStateRepo;
use crate::metrics::EngineMetrics;
use crate::NodeError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CandidacyOutcome {
    Registered(Candidate),
    AlreadyStanding(Candidate),
    /// Candidates can only stand while a cycle is running.
    NoElectionRunning,
}

pub struct Candidacy {
    platform: Arc<dyn MessagingPlatform>,
    ballots: Arc<dyn BallotStore>,
    repo: Arc<CycleStateRepo>,
    clock: Arc<dyn Clock>,
    metrics: Arc<EngineMetrics>,
    election_channel: ChannelId,
    vote_emoji: String,
}

impl Candidacy {
    pub fn new(
        platform: Arc<dyn MessagingPlatform>,
        ballots: Arc<dyn BallotStore>,
        repo: Arc<CycleStateRepo>,
        clock: Arc<dyn Clock>,
        metrics: Arc<EngineMetrics>,
        election_channel: ChannelId,
        vote_emoji: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            ballots,
            repo,
            clock,
            metrics,
            election_channel,
            vote_emoji: vote_emoji.into(),
        }
    }

    /// Post `candidate`'s campaign surface, seed it with the vote emoji and
    /// register them for the running cycle.
    pub async fn stand(&self, candidate: UserId, pitch: &str) -> Result<CandidacyOutcome, NodeError> {
        if !self.repo.load()?.is_on {
            return Ok(CandidacyOutcome::NoElectionRunning);
        }
        if let Some(existing) = self.ballots.find_candidate(candidate)? {
            return Ok(CandidacyOutcome::AlreadyStanding(existing));
        }

        let text = format!(
            "**{} is standing for election!**\n\n{}\n\nReact with {} to vote for them.",
            candidate.mention(),
            pitch.trim(),
            self.vote_emoji
        );
        let ballot = self
            .platform
            .post_message(self.election_channel, &text)
            .await?;
        if let Err(e) = self.platform.add_reaction(ballot, &self.vote_emoji).await {
            tracing::warn!(surface = %ballot, error = %e, "could not seed campaign surface");
        }

        match self
            .ballots
            .insert_candidate(candidate, ballot, self.clock.now())
        {
            Ok(registered) => {
                self.metrics.candidates.inc();
                tracing::info!(candidate = %candidate, surface = %ballot, "candidate registered");
                Ok(CandidacyOutcome::Registered(registered))
            }
            Err(StoreError::DuplicateCandidate(_)) => {
                // Lost a race with a concurrent registration; drop our surface.
                if let Err(e) = self.platform.delete_message(ballot).await {
                    tracing::warn!(surface = %ballot, error = %e, "could not delete stray campaign surface");
                }
                let existing = self
                    .ballots
                    .find_candidate(candidate)?
                    .ok_or_else(|| StoreError::NotFound(format!("candidate {candidate}")))?;
                Ok(CandidacyOutcome::AlreadyStanding(existing))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn candidate(&self, user: UserId) -> Result<Option<Candidate>, NodeError> {
        Ok(self.ballots.find_candidate(user)?)
    }

    pub fn candidates(&self) -> Result<Vec<Candidate>, NodeError> {
        Ok(self.ballots.list_candidates()?)
    }
}
