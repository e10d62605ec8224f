//! Target surface errors.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SurfaceError {
    #[error("Surface unreachable: {0}")]
    Unreachable(String),

    #[error("Handshake timed out after {0}ms")]
    HandshakeTimeout(u64),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Action failed: {0}")]
    ActionFailed(String),

    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl SurfaceError {
    /// Whether the surface can no longer be driven at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}
