//! Error types for anchor synchronization sessions.

use crate::event::AnchorId;

/// Failures surfaced by an asset source while producing the character.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("asset {0} has no skeleton and cannot be driven by body tracking")]
    NotRigCapable(String),

    #[error("asset I/O failed: {0}")]
    Io(String),

    #[error("asset load was cancelled before completing")]
    Cancelled,
}

/// Error taxonomy for a tracking session.
///
/// Only [`SessionError::UnsupportedCapability`], [`SessionError::SceneDescription`]
/// and [`SessionError::Config`] stop a session, and only before tracking
/// begins. Everything raised per frame is logged and isolated to the event
/// that caused it.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to load asset {asset}: {reason}")]
    AssetLoadFailure { asset: String, reason: AssetError },

    #[error("unsupported device capability: {0}")]
    UnsupportedCapability(String),

    #[error("malformed anchor event {id}: {reason}")]
    MalformedAnchorEvent { id: AnchorId, reason: String },

    #[error("scene description unavailable: {0}")]
    SceneDescription(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("tracking session closed")]
    SessionClosed,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SessionError {
    /// True for errors that must abort session start
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::UnsupportedCapability(_)
                | SessionError::SceneDescription(_)
                | SessionError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality() {
        assert!(SessionError::UnsupportedCapability("body tracking".into()).is_fatal());
        assert!(!SessionError::AssetLoadFailure {
            asset: "models/robot".into(),
            reason: AssetError::Cancelled,
        }
        .is_fatal());
        assert!(!SessionError::MalformedAnchorEvent {
            id: AnchorId::new(),
            reason: "NaN".into(),
        }
        .is_fatal());
    }

    #[test]
    fn test_messages_are_human_readable() {
        let err = SessionError::AssetLoadFailure {
            asset: "models/robot".into(),
            reason: AssetError::NotFound("models/robot".into()),
        };
        assert_eq!(
            err.to_string(),
            "failed to load asset models/robot: asset not found: models/robot"
        );
    }
}
