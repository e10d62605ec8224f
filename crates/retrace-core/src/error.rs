//! Errors raised by the controller and its collaborators.

use retrace_protocols::{PlaybackError, RecorderError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Surface already registered: {0}")]
    SurfaceExists(String),

    #[error("Unknown surface: {0}")]
    UnknownSurface(String),

    #[error("No recording in progress")]
    NoActiveRecording,

    #[error("Recording {0} is already in progress")]
    RecordingInProgress(String),

    #[error("Invalid recording document: {0}")]
    InvalidImport(String),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Recorder error: {0}")]
    Recorder(#[from] RecorderError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
