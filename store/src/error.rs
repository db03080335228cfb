use coop_types::UserId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("voter {0} already voted this cycle")]
    DuplicateVoter(UserId),

    #[error("candidate {0} is already standing this cycle")]
    DuplicateCandidate(UserId),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}
