//! LMDB implementation of BallotStore.
//!
//! Candidates are keyed by a monotonically increasing registration sequence so
//! iteration yields registration order; two index databases map a candidate's
//! user id and ballot surface back to that sequence. Votes are keyed by voter,
//! which makes "one vote per voter" a property of the key space. LMDB admits a
//! single writer at a time, so check-then-insert inside one write transaction
//! is atomic.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use coop_store::{BallotStore, StoreError};
use coop_types::{Candidate, MessageRef, Timestamp, UserId, Vote};

use crate::LmdbError;

const CANDIDATE_SEQ_KEY: &[u8] = b"candidate_seq";

pub struct LmdbBallotStore {
    pub(crate) env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
    pub(crate) candidates_db: Database<Bytes, Bytes>,
    pub(crate) candidate_by_user_db: Database<Bytes, Bytes>,
    pub(crate) candidate_by_surface_db: Database<Bytes, Bytes>,
    pub(crate) votes_db: Database<Bytes, Bytes>,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn seq_from_bytes(bytes: &[u8]) -> Result<u64, StoreError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Corruption("candidate sequence has unexpected length".into()))?;
    Ok(u64::from_be_bytes(arr))
}

impl LmdbBallotStore {
    fn candidate_by_seq_key(&self, rtxn: &RoTxn, seq_bytes: &[u8]) -> Result<Candidate, StoreError> {
        let bytes = self
            .candidates_db
            .get(rtxn, seq_bytes)
            .map_err(LmdbError::from)?
            .ok_or_else(|| {
                StoreError::Corruption("candidate index points at a missing record".into())
            })?;
        decode(bytes)
    }
}

impl BallotStore for LmdbBallotStore {
    fn insert_vote(
        &self,
        voter: UserId,
        candidate: UserId,
        cast_at: Timestamp,
    ) -> Result<(), StoreError> {
        let key = voter.to_be_bytes();
        let vote = Vote {
            voter_id: voter,
            candidate_id: candidate,
            cast_at,
        };
        let value = encode(&vote)?;

        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .votes_db
            .get(&wtxn, &key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::DuplicateVoter(voter));
        }
        self.votes_db
            .put(&mut wtxn, &key, &value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn find_vote_by_voter(&self, voter: UserId) -> Result<Option<Vote>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .votes_db
            .get(&rtxn, &voter.to_be_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn list_votes(&self) -> Result<Vec<Vote>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.votes_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut votes = Vec::new();
        for entry in iter {
            let (_, val) = entry.map_err(LmdbError::from)?;
            votes.push(decode(val)?);
        }
        Ok(votes)
    }

    fn delete_all_votes(&self) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.votes_db.clear(&mut wtxn).map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn insert_candidate(
        &self,
        candidate: UserId,
        ballot: MessageRef,
        registered_at: Timestamp,
    ) -> Result<Candidate, StoreError> {
        let user_key = candidate.to_be_bytes();
        let record = Candidate {
            candidate_id: candidate,
            ballot,
            registered_at,
        };
        let value = encode(&record)?;

        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .candidate_by_user_db
            .get(&wtxn, &user_key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::DuplicateCandidate(candidate));
        }

        let seq = match self
            .meta_db
            .get(&wtxn, CANDIDATE_SEQ_KEY)
            .map_err(LmdbError::from)?
        {
            Some(bytes) => seq_from_bytes(bytes)? + 1,
            None => 0,
        };
        let seq_key = seq.to_be_bytes();

        self.candidates_db
            .put(&mut wtxn, &seq_key, &value)
            .map_err(LmdbError::from)?;
        self.candidate_by_user_db
            .put(&mut wtxn, &user_key, &seq_key)
            .map_err(LmdbError::from)?;
        self.candidate_by_surface_db
            .put(&mut wtxn, &ballot.to_key(), &seq_key)
            .map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, CANDIDATE_SEQ_KEY, &seq_key)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;

        tracing::debug!(candidate = %candidate, seq, "candidate registered");
        Ok(record)
    }

    fn list_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.candidates_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut candidates = Vec::new();
        for entry in iter {
            let (_, val) = entry.map_err(LmdbError::from)?;
            candidates.push(decode(val)?);
        }
        Ok(candidates)
    }

    fn find_candidate(&self, candidate: UserId) -> Result<Option<Candidate>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .candidate_by_user_db
            .get(&rtxn, &candidate.to_be_bytes())
            .map_err(LmdbError::from)?
        {
            Some(seq_bytes) => Ok(Some(self.candidate_by_seq_key(&rtxn, seq_bytes)?)),
            None => Ok(None),
        }
    }

    fn find_candidate_by_surface(
        &self,
        ballot: MessageRef,
    ) -> Result<Option<Candidate>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .candidate_by_surface_db
            .get(&rtxn, &ballot.to_key())
            .map_err(LmdbError::from)?
        {
            Some(seq_bytes) => Ok(Some(self.candidate_by_seq_key(&rtxn, seq_bytes)?)),
            None => Ok(None),
        }
    }

    fn delete_all_candidates(&self) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.candidates_db
            .clear(&mut wtxn)
            .map_err(LmdbError::from)?;
        self.candidate_by_user_db
            .clear(&mut wtxn)
            .map_err(LmdbError::from)?;
        self.candidate_by_surface_db
            .clear(&mut wtxn)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{LmdbEnvironment, DEFAULT_MAP_SIZE};
    use coop_types::{ChannelId, MessageId};
    use std::sync::Barrier;

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), DEFAULT_MAP_SIZE).expect("open env");
        (dir, env)
    }

    fn surface(message: u64) -> MessageRef {
        MessageRef::new(ChannelId::new(10), MessageId::new(message))
    }

    #[test]
    fn candidates_listed_in_registration_order() {
        let (_dir, env) = temp_env();
        let store = env.ballot_store();
        // Higher user id registers first.
        store
            .insert_candidate(UserId::new(900), surface(1), Timestamp::new(5))
            .unwrap();
        store
            .insert_candidate(UserId::new(100), surface(2), Timestamp::new(6))
            .unwrap();

        let ids: Vec<UserId> = store
            .list_candidates()
            .unwrap()
            .into_iter()
            .map(|c| c.candidate_id)
            .collect();
        assert_eq!(ids, vec![UserId::new(900), UserId::new(100)]);
    }

    #[test]
    fn candidate_lookup_by_user_and_surface() {
        let (_dir, env) = temp_env();
        let store = env.ballot_store();
        let registered = store
            .insert_candidate(UserId::new(1), surface(77), Timestamp::new(5))
            .unwrap();

        assert_eq!(store.find_candidate(UserId::new(1)).unwrap(), Some(registered.clone()));
        assert_eq!(
            store.find_candidate_by_surface(surface(77)).unwrap(),
            Some(registered)
        );
        assert_eq!(store.find_candidate_by_surface(surface(78)).unwrap(), None);
        assert_eq!(store.find_candidate(UserId::new(2)).unwrap(), None);
    }

    #[test]
    fn duplicate_candidate_rejected() {
        let (_dir, env) = temp_env();
        let store = env.ballot_store();
        store
            .insert_candidate(UserId::new(1), surface(1), Timestamp::new(5))
            .unwrap();
        let err = store
            .insert_candidate(UserId::new(1), surface(2), Timestamp::new(6))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCandidate(id) if id == UserId::new(1)));
        assert_eq!(store.list_candidates().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_voter_rejected() {
        let (_dir, env) = temp_env();
        let store = env.ballot_store();
        store
            .insert_vote(UserId::new(5), UserId::new(1), Timestamp::new(10))
            .unwrap();
        let err = store
            .insert_vote(UserId::new(5), UserId::new(2), Timestamp::new(11))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateVoter(_)));

        let vote = store.find_vote_by_voter(UserId::new(5)).unwrap().unwrap();
        assert_eq!(vote.candidate_id, UserId::new(1));
        assert_eq!(vote.cast_at, Timestamp::new(10));
    }

    #[test]
    fn concurrent_votes_from_one_voter_admit_exactly_one() {
        let (_dir, env) = temp_env();
        let store = env.ballot_store();
        let barrier = Barrier::new(8);

        let accepted = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8u64)
                .map(|i| {
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        store
                            .insert_vote(UserId::new(42), UserId::new(i), Timestamp::new(i))
                            .is_ok()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        assert_eq!(accepted, 1);
        assert_eq!(store.list_votes().unwrap().len(), 1);
    }

    #[test]
    fn clearing_empties_both_tables() {
        let (_dir, env) = temp_env();
        let store = env.ballot_store();
        store
            .insert_candidate(UserId::new(1), surface(1), Timestamp::new(5))
            .unwrap();
        store
            .insert_vote(UserId::new(2), UserId::new(1), Timestamp::new(6))
            .unwrap();

        store.delete_all_votes().unwrap();
        store.delete_all_candidates().unwrap();

        assert!(store.list_candidates().unwrap().is_empty());
        assert!(store.list_votes().unwrap().is_empty());
        assert_eq!(store.find_vote_by_voter(UserId::new(2)).unwrap(), None);
        assert_eq!(store.find_candidate_by_surface(surface(1)).unwrap(), None);

        // The same user can stand again in the next cycle.
        store
            .insert_candidate(UserId::new(1), surface(3), Timestamp::new(7))
            .unwrap();
        assert_eq!(store.list_candidates().unwrap().len(), 1);
    }
}
