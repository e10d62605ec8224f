//! Playback errors.

use thiserror::Error;

use super::{LocatorError, StoreError, SurfaceError};

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Surface unreachable: {0}")]
    SurfaceUnreachable(String),

    #[error("Handshake timed out after {0}ms")]
    HandshakeTimeout(u64),

    #[error("Action failed: {0}")]
    ActionFailed(String),

    #[error("Invalid recording: {0}")]
    InvalidRecording(String),

    #[error("Recording not found: {0}")]
    RecordingNotFound(String),

    #[error("Unknown surface: {0}")]
    UnknownSurface(String),

    #[error("Surface cannot be automated: {0}")]
    RestrictedSurface(String),

    #[error("Speed multiplier {0} is outside 0.1..=10")]
    InvalidSpeed(f64),

    #[error("No active playback session on surface {0}")]
    NoActiveSession(String),

    #[error("Surface {0} is busy")]
    SurfaceBusy(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl PlaybackError {
    /// Whether this failure tears the session down instead of being retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SurfaceUnreachable(_))
    }
}

impl From<SurfaceError> for PlaybackError {
    fn from(err: SurfaceError) -> Self {
        match err {
            SurfaceError::Unreachable(msg) => Self::SurfaceUnreachable(msg),
            SurfaceError::HandshakeTimeout(ms) => Self::HandshakeTimeout(ms),
            SurfaceError::ElementNotFound(locator) => Self::ElementNotFound(locator),
            other => Self::ActionFailed(other.to_string()),
        }
    }
}

impl From<LocatorError> for PlaybackError {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::ElementNotFound(locator) => Self::ElementNotFound(locator),
            other => Self::ActionFailed(other.to_string()),
        }
    }
}
