//! Key-value configuration storage trait.

use crate::StoreError;

/// Scalar configuration values shared across restarts (election flag, last
/// election timestamp, status surface link).
pub trait ConfigStore: Send + Sync {
    /// Read a value; `None` when the key was never set.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a value. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Well-known config keys.
pub mod keys {
    /// `"true"` while a cycle is running.
    pub const ELECTION_ON: &str = "election_on";
    /// Unix seconds of the last cycle start.
    pub const LAST_ELECTION: &str = "last_election";
    /// `channel/message` of the election status surface.
    pub const ELECTION_MESSAGE_LINK: &str = "election_message_link";
    /// User id of the commander elected by the last completed cycle.
    pub const LAST_COMMANDER: &str = "last_commander";
    /// Comma-separated user ids of the leaders elected by the last completed cycle.
    pub const LAST_LEADERS: &str = "last_leaders";
    /// Anchor (unix seconds) of the cycle that elected the last commander.
    pub const LAST_RESULTS_CYCLE: &str = "last_results_cycle";
}
