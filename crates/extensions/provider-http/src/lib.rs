//! HTTP-backed variable providers for Retrace.
//!
//! - [`HttpJsonFetcher`] fetches JSON documents for remote variables.
//! - [`HttpGenerationProvider`] asks a generation endpoint for a value.

mod api;
mod fetcher;
mod generator;

pub use fetcher::HttpJsonFetcher;
pub use generator::HttpGenerationProvider;

use std::time::Duration;

/// Client shared by both providers.
fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}
