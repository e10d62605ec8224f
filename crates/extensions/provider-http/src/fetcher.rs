//! Remote variable fetcher.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use retrace_protocols::{FetchError, JsonFetcher};

use crate::build_client;

/// Fetches JSON with a plain `GET`.
pub struct HttpJsonFetcher {
    client: reqwest::Client,
}

impl HttpJsonFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = build_client(timeout).map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl JsonFetcher for HttpJsonFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        debug!(url, "Fetching remote variable");
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| FetchError::InvalidJson(e.to_string()))
    }
}
