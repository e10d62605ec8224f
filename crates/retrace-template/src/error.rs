//! Variable resolution errors. Always recovered with the static fallback.

use retrace_protocols::{FetchError, GenerationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Path '{0}' not found in response")]
    PathNotFound(String),
}
