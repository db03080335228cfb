use coop_types::MessageRef;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    /// The message no longer exists (deleted externally).
    #[error("message {0} not found")]
    NotFound(MessageRef),

    #[error("missing permission: {0}")]
    Forbidden(String),

    /// Transport failure, rate limit, outage.
    #[error("platform unavailable: {0}")]
    Unavailable(String),
}
