//! Generation endpoint client.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use retrace_protocols::{GenerationError, GenerationProvider};

use crate::api::{GenerateRequest, GenerateResponse};
use crate::build_client;

/// Posts `{name, prompt}` to an endpoint that answers
/// `{success, answer}`.
pub struct HttpGenerationProvider {
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpGenerationProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, GenerationError> {
        let client =
            build_client(timeout).map_err(|e| GenerationError::Request(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            api_key: None,
            client,
        })
    }

    /// Sends the key as a bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[async_trait]
impl GenerationProvider for HttpGenerationProvider {
    fn id(&self) -> &str {
        "http"
    }

    async fn generate(&self, name: &str, prompt: &str) -> Result<String, GenerationError> {
        debug!(variable = name, "Requesting generated value");
        let mut request = self
            .client
            .post(&self.url)
            .json(&GenerateRequest { name, prompt });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Request(format!("status {status}: {text}")));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        match body.answer {
            Some(answer) if body.success && !answer.is_empty() => Ok(answer),
            _ => Err(GenerationError::Unsuccessful(
                body.error.unwrap_or_else(|| "no answer".to_string()),
            )),
        }
    }
}
