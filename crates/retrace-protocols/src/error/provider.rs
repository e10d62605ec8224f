//! Variable-resolution collaborator errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation provider not configured")]
    NotConfigured,

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Provider reported failure: {0}")]
    Unsuccessful(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected status {0}")]
    Status(u16),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
}
