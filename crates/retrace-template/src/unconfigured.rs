//! Stand-in collaborator for setups without a generation provider or fetcher.

use async_trait::async_trait;
use retrace_protocols::{FetchError, GenerationError, GenerationProvider, JsonFetcher};
use serde_json::Value;

/// Fails every request, so variables fall back to their static values.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unconfigured;

#[async_trait]
impl GenerationProvider for Unconfigured {
    fn id(&self) -> &str {
        "unconfigured"
    }

    async fn generate(&self, _name: &str, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::NotConfigured)
    }
}

#[async_trait]
impl JsonFetcher for Unconfigured {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        Err(FetchError::Request(format!("no fetcher configured for {url}")))
    }
}
