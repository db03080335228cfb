//! Candidate and vote storage trait.

use coop_types::{Candidate, MessageRef, Timestamp, UserId, Vote};

use crate::StoreError;

/// Persistence for the current cycle's candidates and votes.
///
/// Logical schema: `candidates(candidate_id, campaign_surface_ref)` and
/// `election_votes(candidate_id, voter_id, time)`.
pub trait BallotStore: Send + Sync {
    /// Record a vote. Fails with [`StoreError::DuplicateVoter`] if the voter
    /// already has a vote this cycle; the check and the insert are atomic.
    fn insert_vote(
        &self,
        voter: UserId,
        candidate: UserId,
        cast_at: Timestamp,
    ) -> Result<(), StoreError>;

    /// The vote cast by `voter` this cycle, if any.
    fn find_vote_by_voter(&self, voter: UserId) -> Result<Option<Vote>, StoreError>;

    /// All votes recorded this cycle.
    fn list_votes(&self) -> Result<Vec<Vote>, StoreError>;

    fn delete_all_votes(&self) -> Result<(), StoreError>;

    /// Register a candidate. Fails with [`StoreError::DuplicateCandidate`] if
    /// the user is already standing.
    fn insert_candidate(
        &self,
        candidate: UserId,
        ballot: MessageRef,
        registered_at: Timestamp,
    ) -> Result<Candidate, StoreError>;

    /// Candidates in registration order.
    fn list_candidates(&self) -> Result<Vec<Candidate>, StoreError>;

    fn find_candidate(&self, candidate: UserId) -> Result<Option<Candidate>, StoreError>;

    fn find_candidate_by_surface(&self, ballot: MessageRef)
        -> Result<Option<Candidate>, StoreError>;

    fn delete_all_candidates(&self) -> Result<(), StoreError>;
}
