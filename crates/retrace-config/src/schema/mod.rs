//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

mod schema_infra;
mod schema_playback;

pub use schema_infra::*;
pub use schema_playback::*;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub recorder: RecorderConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
