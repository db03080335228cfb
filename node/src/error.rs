use coop_messages::PlatformError;
use coop_store::StoreError;
use coop_types::{MessageRef, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("external collaborator unavailable: {0}")]
    ExternalUnavailable(String),

    #[error("ballot surface {0} is gone")]
    SurfaceGone(MessageRef),

    #[error("user {0} is not a member of the guild")]
    InvalidTarget(UserId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("governance error: {0}")]
    Governance(#[from] coop_governance::GovernanceError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a failure is handled by the action that hit it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Skip this action; the next tick or event retries.
    ExternalUnavailable,
    /// Expected outcome, not a failure.
    DuplicateVoter,
    /// Treated as zero votes; the candidate stays registered.
    SurfaceGone,
    /// Abort the ballot resolution without touching state.
    InvalidTarget,
    /// Operator has to fix configuration or data.
    Misconfigured,
}

impl NodeError {
    pub fn classify(&self) -> ErrorClass {
        match self {
            Self::SurfaceGone(_) | Self::Platform(PlatformError::NotFound(_)) => {
                ErrorClass::SurfaceGone
            }
            Self::InvalidTarget(_) => ErrorClass::InvalidTarget,
            Self::Store(StoreError::DuplicateVoter(_)) => ErrorClass::DuplicateVoter,
            Self::Store(StoreError::Corruption(_))
            | Self::Platform(PlatformError::Forbidden(_))
            | Self::Governance(_)
            | Self::Config(_) => ErrorClass::Misconfigured,
            Self::ExternalUnavailable(_)
            | Self::Store(_)
            | Self::Platform(_)
            | Self::Io(_) => ErrorClass::ExternalUnavailable,
        }
    }

    /// Map a platform `NotFound` on `surface` to [`NodeError::SurfaceGone`].
    pub fn from_surface(surface: MessageRef, err: PlatformError) -> Self {
        match err {
            PlatformError::NotFound(_) => Self::SurfaceGone(surface),
            other => Self::Platform(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coop_types::{ChannelId, MessageId};

    fn surface() -> MessageRef {
        MessageRef::new(ChannelId::new(1), MessageId::new(2))
    }

    #[test]
    fn taxonomy() {
        assert_eq!(
            NodeError::from(StoreError::DuplicateVoter(UserId::new(3))).classify(),
            ErrorClass::DuplicateVoter
        );
        assert_eq!(
            NodeError::from(PlatformError::Unavailable("down".into())).classify(),
            ErrorClass::ExternalUnavailable
        );
        assert_eq!(
            NodeError::from(StoreError::Backend("disk".into())).classify(),
            ErrorClass::ExternalUnavailable
        );
        assert_eq!(
            NodeError::InvalidTarget(UserId::new(3)).classify(),
            ErrorClass::InvalidTarget
        );
        assert_eq!(
            NodeError::Config("bad".into()).classify(),
            ErrorClass::Misconfigured
        );
    }

    #[test]
    fn not_found_on_surface_is_surface_gone() {
        let err = NodeError::from_surface(surface(), PlatformError::NotFound(surface()));
        assert!(matches!(err, NodeError::SurfaceGone(s) if s == surface()));
        assert_eq!(err.classify(), ErrorClass::SurfaceGone);

        let err = NodeError::from_surface(surface(), PlatformError::Unavailable("x".into()));
        assert_eq!(err.classify(), ErrorClass::ExternalUnavailable);
    }
}
