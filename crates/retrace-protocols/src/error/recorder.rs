//! Event recorder errors.

use thiserror::Error;

use super::SurfaceError;

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("Recorder already started")]
    AlreadyStarted,

    #[error("Recorder is not running")]
    NotRunning,

    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_surface_error() {
        let err: RecorderError = SurfaceError::CaptureUnavailable("no binding".to_string()).into();
        assert!(err.to_string().contains("no binding"));
    }
}
