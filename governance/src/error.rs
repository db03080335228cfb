use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("election interval ({interval_secs}s) must be longer than the voting window ({duration_secs}s)")]
    IntervalNotLongerThanDuration {
        interval_secs: u64,
        duration_secs: u64,
    },

    #[error("voting window must be at least one second long")]
    EmptyVotingWindow,

    #[error("{name} must be between 1 and 9999 basis points, got {bps}")]
    FractionOutOfRange { name: &'static str, bps: u32 },
}
