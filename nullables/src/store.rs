//! Nullable stores: thread-safe in-memory storage for testing.

use coop_store::{BallotStore, ConfigStore, StoreError};
use coop_types::{Candidate, MessageRef, Timestamp, UserId, Vote};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct Ballots {
    /// Registration order.
    candidates: Vec<Candidate>,
    votes: Vec<Vote>,
}

/// In-memory candidates and votes.
///
/// Both duplicate checks happen under the same lock as the insert, matching
/// the atomicity the LMDB store gets from a single write transaction.
#[derive(Default)]
pub struct NullBallotStore {
    inner: Mutex<Ballots>,
    fail_candidate_clear: AtomicBool,
}

impl NullBallotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `delete_all_candidates` fail without touching anything.
    pub fn fail_next_candidate_clear(&self) {
        self.fail_candidate_clear.store(true, Ordering::SeqCst);
    }
}

impl BallotStore for NullBallotStore {
    fn insert_vote(
        &self,
        voter: UserId,
        candidate: UserId,
        cast_at: Timestamp,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.votes.iter().any(|v| v.voter_id == voter) {
            return Err(StoreError::DuplicateVoter(voter));
        }
        inner.votes.push(Vote {
            voter_id: voter,
            candidate_id: candidate,
            cast_at,
        });
        Ok(())
    }

    fn find_vote_by_voter(&self, voter: UserId) -> Result<Option<Vote>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .votes
            .iter()
            .find(|v| v.voter_id == voter)
            .cloned())
    }

    fn list_votes(&self) -> Result<Vec<Vote>, StoreError> {
        Ok(self.inner.lock().unwrap().votes.clone())
    }

    fn delete_all_votes(&self) -> Result<(), StoreError> {
        self.inner.lock().unwrap().votes.clear();
        Ok(())
    }

    fn insert_candidate(
        &self,
        candidate: UserId,
        ballot: MessageRef,
        registered_at: Timestamp,
    ) -> Result<Candidate, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.candidates.iter().any(|c| c.candidate_id == candidate) {
            return Err(StoreError::DuplicateCandidate(candidate));
        }
        let record = Candidate {
            candidate_id: candidate,
            ballot,
            registered_at,
        };
        inner.candidates.push(record.clone());
        Ok(record)
    }

    fn list_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        Ok(self.inner.lock().unwrap().candidates.clone())
    }

    fn find_candidate(&self, candidate: UserId) -> Result<Option<Candidate>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .candidates
            .iter()
            .find(|c| c.candidate_id == candidate)
            .cloned())
    }

    fn find_candidate_by_surface(
        &self,
        ballot: MessageRef,
    ) -> Result<Option<Candidate>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .candidates
            .iter()
            .find(|c| c.ballot == ballot)
            .cloned())
    }

    fn delete_all_candidates(&self) -> Result<(), StoreError> {
        if self.fail_candidate_clear.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("candidate clear failed".into()));
        }
        self.inner.lock().unwrap().candidates.clear();
        Ok(())
    }
}

/// In-memory key-value config.
#[derive(Default)]
pub struct NullConfigStore {
    values: Mutex<HashMap<String, String>>,
    unavailable: AtomicBool,
}

impl NullConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with a backend error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Backend("null config store switched off".into()))
        } else {
            Ok(())
        }
    }
}

impl ConfigStore for NullConfigStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_available()?;
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}
