//! Variable-resolution collaborators.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{FetchError, GenerationError};

/// Produces a value for a generated variable from its prompt.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Returns the provider ID.
    fn id(&self) -> &str;

    async fn generate(&self, name: &str, prompt: &str) -> Result<String, GenerationError>;
}

/// Fetches a JSON document for a remote variable.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError>;
}
