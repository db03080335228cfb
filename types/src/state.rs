//! Persisted election cycle state.

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Process-wide election state, kept in the key-value config store and read
/// fresh on every reconciler tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCycleState {
    /// Whether a cycle is currently running.
    pub is_on: bool,
    /// Anchor for all window math; stamped once per cycle start.
    pub last_started_at: Timestamp,
}

impl ElectionCycleState {
    pub fn new(is_on: bool, last_started_at: Timestamp) -> Self {
        Self {
            is_on,
            last_started_at,
        }
    }
}
