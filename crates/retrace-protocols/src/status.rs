//! Playback state and the status broadcast schema.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Playback session state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Initializing,
    Playing,
    Paused,
    Complete,
    Error,
}

impl PlaybackState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// Whether a session in this state still owns its surface.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Initializing | Self::Playing | Self::Paused)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot broadcast on every transition and dispatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub current_event: usize,
    pub total_events: usize,
    /// Percentage in `0..=100`.
    pub progress: u8,
    pub error_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_id: Option<String>,
    /// Failures recorded against the current event.
    #[serde(default)]
    pub retries: u32,
    /// Events skipped after exhausting their retry budget.
    #[serde(default)]
    pub skipped: u32,
}

impl PlaybackStatus {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn new(state: PlaybackState, current_event: usize, total_events: usize) -> Self {
        Self {
            state,
            current_event,
            total_events,
            progress: progress_percent(current_event, total_events),
            ..Self::default()
        }
    }
}

/// Integer percentage of `current` over `total`, clamped to 100.
pub fn progress_percent(current: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (current.min(total) * 100) / total;
    pct as u8
}
