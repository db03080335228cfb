//! Ballot records persisted for the current election cycle.

use serde::{Deserialize, Serialize};

use crate::{MessageRef, Timestamp, UserId};

/// A member standing in the current election cycle.
///
/// `ballot` points at the campaign message that collects the vote reactions.
/// Destroyed (along with that message) when the cycle clears.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate_id: UserId,
    pub ballot: MessageRef,
    pub registered_at: Timestamp,
}

/// One voter's recorded choice in the current cycle.
///
/// Only used to enforce one vote per voter; the tally itself is read from the
/// live reactions on the candidates' ballot surfaces.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter_id: UserId,
    pub candidate_id: UserId,
    pub cast_at: Timestamp,
}
