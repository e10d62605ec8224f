//! CDP error types.

use retrace_protocols::SurfaceError;
use thiserror::Error;

/// CDP client errors.
#[derive(Debug, Error)]
pub enum CdpError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Chrome not available at {0}. Start Chrome with: chrome --remote-debugging-port=9222")]
    ChromeNotAvailable(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("CDP error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("JavaScript error: {0}")]
    JavaScript(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Session closed")]
    SessionClosed,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl CdpError {
    /// Whether the page can no longer be reached through this connection.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_)
                | Self::ChromeNotAvailable(_)
                | Self::WebSocket(_)
                | Self::SessionClosed
                | Self::PageNotFound(_)
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::ConnectionFailed(format!("Invalid URL: {}", e))
    }
}

impl From<CdpError> for SurfaceError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::ElementNotFound(what) => SurfaceError::ElementNotFound(what),
            e if e.is_disconnect() => SurfaceError::Unreachable(e.to_string()),
            // Chrome reports a detached or unknown node as a protocol error.
            CdpError::Protocol { code: -32000, message } => SurfaceError::ElementNotFound(message),
            other => SurfaceError::ActionFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnects_map_to_unreachable() {
        for err in [
            CdpError::SessionClosed,
            CdpError::WebSocket("reset".to_string()),
            CdpError::PageNotFound("tab-1".to_string()),
        ] {
            assert!(SurfaceError::from(err).is_unreachable());
        }
    }

    #[test]
    fn test_node_errors_map_to_element_not_found() {
        let err = SurfaceError::from(CdpError::Protocol {
            code: -32000,
            message: "No node with given id found".to_string(),
        });
        assert!(matches!(err, SurfaceError::ElementNotFound(_)));

        let err = SurfaceError::from(CdpError::ElementNotFound("#go".to_string()));
        assert!(matches!(err, SurfaceError::ElementNotFound(ref s) if s == "#go"));
    }

    #[test]
    fn test_other_errors_are_action_failures() {
        let err = SurfaceError::from(CdpError::JavaScript("boom".to_string()));
        assert!(matches!(err, SurfaceError::ActionFailed(_)));
        let err = SurfaceError::from(CdpError::Protocol {
            code: -32601,
            message: "method not found".to_string(),
        });
        assert!(matches!(err, SurfaceError::ActionFailed(_)));
    }

    #[test]
    fn test_chrome_not_available_hint() {
        let err = CdpError::ChromeNotAvailable("http://localhost:9222".to_string());
        assert!(err.to_string().contains("--remote-debugging-port"));
    }
}
