//! Recorded event definitions.
//!
//! Events are serialized with a `type` discriminator next to the common
//! `sequence`, `timestamp` and `locator` fields:
//!
//! ```json
//! {"sequence": 3, "timestamp": 1700000000123, "locator": "#email", "type": "input", "value": "a@b.c"}
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::surface::Viewport;

/// A single captured interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedEvent {
    /// Monotonic position within the recording.
    pub sequence: u64,

    /// Capture time in epoch milliseconds.
    pub timestamp: i64,

    /// Locator of the target element, if the event has one.
    #[serde(default, alias = "selector", skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,

    #[serde(flatten)]
    pub payload: EventPayload,
}

impl RecordedEvent {
    pub fn new(sequence: u64, timestamp: i64, payload: EventPayload) -> Self {
        Self {
            sequence,
            timestamp,
            locator: None,
            payload,
        }
    }

    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

/// Keyboard modifier state at the time of a key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn is_empty(&self) -> bool {
        !(self.alt || self.ctrl || self.shift || self.meta)
    }
}

/// What triggered a navigation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NavigationCause {
    HashChange,
    HistoryChange,
    FormNavigation,
}

/// Type-specific event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum EventPayload {
    InitialState {
        url: String,
        #[serde(default)]
        title: String,
        viewport: Viewport,
    },
    Click {
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_tag: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_value: Option<String>,
    },
    #[serde(rename = "dblclick")]
    DoubleClick { x: f64, y: f64 },
    Keydown {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Input { value: String },
    Change {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checked: Option<bool>,
    },
    Submit {
        #[serde(default)]
        form_data: BTreeMap<String, String>,
    },
    Scroll { scroll_x: f64, scroll_y: f64 },
    ViewportChange { width: u32, height: u32 },
    Navigate { url: String, cause: NavigationCause },
    Network {
        method: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
    Custom {
        name: String,
        #[serde(default)]
        detail: Value,
    },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::InitialState { .. } => EventKind::InitialState,
            Self::Click { .. } => EventKind::Click,
            Self::DoubleClick { .. } => EventKind::DoubleClick,
            Self::Keydown { .. } => EventKind::Keydown,
            Self::Input { .. } => EventKind::Input,
            Self::Change { .. } => EventKind::Change,
            Self::Submit { .. } => EventKind::Submit,
            Self::Scroll { .. } => EventKind::Scroll,
            Self::ViewportChange { .. } => EventKind::ViewportChange,
            Self::Navigate { .. } => EventKind::Navigate,
            Self::Network { .. } => EventKind::Network,
            Self::Custom { .. } => EventKind::Custom,
        }
    }

    /// Text fields that may carry `{{variable}}` tokens.
    pub fn templated_values_mut(&mut self) -> Vec<&mut String> {
        match self {
            Self::Input { value } | Self::Change { value, .. } => vec![value],
            Self::Submit { form_data } => form_data.values_mut().collect(),
            _ => Vec::new(),
        }
    }
}

/// Event type without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    InitialState,
    Click,
    DoubleClick,
    Keydown,
    Input,
    Change,
    Submit,
    Scroll,
    ViewportChange,
    Navigate,
    Network,
    Custom,
}

impl EventKind {
    /// Wire name used in the `type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitialState => "initial-state",
            Self::Click => "click",
            Self::DoubleClick => "dblclick",
            Self::Keydown => "keydown",
            Self::Input => "input",
            Self::Change => "change",
            Self::Submit => "submit",
            Self::Scroll => "scroll",
            Self::ViewportChange => "viewport-change",
            Self::Navigate => "navigate",
            Self::Network => "network",
            Self::Custom => "custom",
        }
    }

    /// Kinds that are rate-limited by window rather than by minimum gap.
    pub fn is_windowed(&self) -> bool {
        matches!(self, Self::Scroll | Self::ViewportChange)
    }

    /// Kinds that only carry information and have no replay action.
    pub fn is_passive(&self) -> bool {
        matches!(self, Self::ViewportChange | Self::Network | Self::Custom)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
