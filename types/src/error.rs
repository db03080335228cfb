//! Parse errors for the shared types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid snowflake id: {0}")]
    InvalidId(String),

    #[error("invalid message reference '{0}': expected <channel>/<message>")]
    InvalidMessageRef(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
