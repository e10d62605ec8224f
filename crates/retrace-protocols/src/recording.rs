//! Recording definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;
use crate::event::RecordedEvent;
use crate::variable::CustomVariable;

/// A named, ordered sequence of captured events plus settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub origin_url: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Events as stored; ordering is defined by `sequence`, see [`Recording::sorted_events`].
    #[serde(default)]
    pub events: Vec<RecordedEvent>,

    #[serde(default)]
    pub settings: RecordingSettings,
}

/// Flags and variables authored before capture starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSettings {
    #[serde(default)]
    pub flags: RecordingFlags,

    #[serde(default)]
    pub variables: Vec<CustomVariable>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordingFlags {
    pub bypass_captcha: bool,
    /// Capture fetch/XHR traffic as network events.
    pub xhr_intercept: bool,
    pub multi_tab: bool,
    pub magic_scrape: bool,
}

impl Recording {
    pub fn new(id: impl Into<String>, name: impl Into<String>, origin_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            origin_url: origin_url.into(),
            created_at: Utc::now(),
            events: Vec::new(),
            settings: RecordingSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: RecordingSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_events(mut self, events: Vec<RecordedEvent>) -> Self {
        self.events = events;
        self
    }

    /// Events ordered by ascending `sequence`, regardless of storage order.
    pub fn sorted_events(&self) -> Vec<RecordedEvent> {
        let mut events = self.events.clone();
        events.sort_by_key(|e| e.sequence);
        events
    }

    /// Wall-clock span between the first and last captured event.
    pub fn duration_ms(&self) -> i64 {
        let min = self.events.iter().map(|e| e.timestamp).min();
        let max = self.events.iter().map(|e| e.timestamp).max();
        match (min, max) {
            (Some(min), Some(max)) => max - min,
            _ => 0,
        }
    }

    /// Checks that the recording can be replayed.
    pub fn validate(&self) -> Result<(), PlaybackError> {
        if self.events.is_empty() {
            return Err(PlaybackError::InvalidRecording(format!(
                "recording {} has no events",
                self.id
            )));
        }

        let mut sequences: Vec<u64> = self.events.iter().map(|e| e.sequence).collect();
        sequences.sort_unstable();
        if sequences.windows(2).any(|w| w[0] == w[1]) {
            return Err(PlaybackError::InvalidRecording(format!(
                "recording {} has duplicate sequence numbers",
                self.id
            )));
        }

        let mut names: Vec<&str> = self.settings.variables.iter().map(|v| v.name.as_str()).collect();
        names.sort_unstable();
        if names.windows(2).any(|w| w[0] == w[1]) {
            return Err(PlaybackError::InvalidRecording(format!(
                "recording {} declares a variable twice",
                self.id
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "recording_tests.rs"]
mod tests;
