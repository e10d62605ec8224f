//! Playback and capture tuning.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Replay timing and failure budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Floor for the delay between two dispatched events.
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Failures allowed at one event before it is skipped.
    #[serde(default = "default_event_retry_budget")]
    pub event_retry_budget: u32,

    /// Skipped events allowed before playback ends in error.
    #[serde(default = "default_total_failure_budget")]
    pub total_failure_budget: u32,

    /// Recovery handshake backoff per skipped event.
    #[serde(default = "default_recovery_backoff_ms")]
    pub recovery_backoff_ms: u64,

    #[serde(default = "default_max_recovery_backoff_ms")]
    pub max_recovery_backoff_ms: u64,

    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    #[serde(default = "default_speed")]
    pub default_speed: f64,

    /// URL prefixes that can never be automated.
    #[serde(default = "default_restricted_prefixes")]
    pub restricted_prefixes: Vec<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            event_retry_budget: default_event_retry_budget(),
            total_failure_budget: default_total_failure_budget(),
            recovery_backoff_ms: default_recovery_backoff_ms(),
            max_recovery_backoff_ms: default_max_recovery_backoff_ms(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            default_speed: default_speed(),
            restricted_prefixes: default_restricted_prefixes(),
        }
    }
}

impl PlaybackConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Backoff before the next recovery handshake: `base * (skipped + 1)`, capped.
    pub fn recovery_backoff(&self, skipped: u32) -> Duration {
        let ms = self
            .recovery_backoff_ms
            .saturating_mul(u64::from(skipped) + 1)
            .min(self.max_recovery_backoff_ms);
        Duration::from_millis(ms)
    }

    pub fn is_restricted(&self, url: &str) -> bool {
        self.restricted_prefixes.iter().any(|p| url.starts_with(p.as_str()))
    }
}

fn default_min_delay_ms() -> u64 {
    100
}

fn default_event_retry_budget() -> u32 {
    5
}

fn default_total_failure_budget() -> u32 {
    3
}

fn default_recovery_backoff_ms() -> u64 {
    250
}

fn default_max_recovery_backoff_ms() -> u64 {
    5_000
}

fn default_handshake_timeout_ms() -> u64 {
    5_000
}

fn default_speed() -> f64 {
    1.0
}

fn default_restricted_prefixes() -> Vec<String> {
    ["chrome://", "chrome-extension://", "devtools://", "edge://", "about:"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Capture throttling and filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Minimum gap between two emitted events of non-windowed kinds.
    #[serde(default = "default_min_event_gap_ms")]
    pub min_event_gap_ms: u64,

    /// Window for scroll and resize events.
    #[serde(default = "default_throttle_window_ms")]
    pub throttle_window_ms: u64,

    /// Id/class prefix of the recorder's own injected controls.
    #[serde(default = "default_control_prefix")]
    pub control_prefix: String,

    /// Class prefixes considered framework-private.
    #[serde(default = "default_private_class_prefixes")]
    pub private_class_prefixes: Vec<String>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            min_event_gap_ms: default_min_event_gap_ms(),
            throttle_window_ms: default_throttle_window_ms(),
            control_prefix: default_control_prefix(),
            private_class_prefixes: default_private_class_prefixes(),
        }
    }
}

fn default_min_event_gap_ms() -> u64 {
    50
}

fn default_throttle_window_ms() -> u64 {
    250
}

fn default_control_prefix() -> String {
    "retrace-".to_string()
}

fn default_private_class_prefixes() -> Vec<String> {
    ["ng-", "css-", "jsx-", "sc-", "svelte-", "ember-", "v-"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
