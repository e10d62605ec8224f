//! Normalization, throttling and sequencing of raw interactions.

use std::collections::HashMap;

use retrace_config::RecorderConfig;
use retrace_locator::{LocatorGenerator, LocatorOptions};
use retrace_protocols::{
    CapturedTarget, Document, EventKind, EventPayload, InteractionKind, NodeId, PageState,
    RawInteraction, RecordedEvent,
};
use serde_json::Value;
use tracing::trace;

/// Name of the custom event emitted when capture stops.
pub const STOP_MARKER: &str = "recording-stopped";

const MAX_NETWORK_BODY: usize = 1000;

/// Stateful capture pipeline.
///
/// Scroll and resize each allow one event per throttle window. Every other
/// kind needs the minimum gap since the previous emitted event. Dropped
/// events consume no sequence number.
pub struct CapturePipeline {
    generator: LocatorGenerator,
    config: RecorderConfig,
    next_sequence: u64,
    last_emitted_at: Option<i64>,
    window_opened_at: HashMap<EventKind, i64>,
}

impl CapturePipeline {
    pub fn new(config: RecorderConfig) -> Self {
        let generator = LocatorGenerator::new(LocatorOptions {
            private_class_prefixes: config.private_class_prefixes.clone(),
            ..LocatorOptions::default()
        });
        Self {
            generator,
            config,
            next_sequence: 0,
            last_emitted_at: None,
            window_opened_at: HashMap::new(),
        }
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Synthesized first event describing the page. Does not count towards
    /// throttling.
    pub fn initial_state(&mut self, page: &PageState, at: i64) -> RecordedEvent {
        let payload = EventPayload::InitialState {
            url: page.url.clone(),
            title: page.title.clone(),
            viewport: page.viewport,
        };
        self.emit(at, None, payload)
    }

    /// Lifecycle marker emitted on stop. Neither throttled nor counted
    /// towards throttling.
    pub fn marker(&mut self, name: &str, at: i64, detail: Value) -> RecordedEvent {
        let payload = EventPayload::Custom {
            name: name.to_string(),
            detail,
        };
        self.emit(at, None, payload)
    }

    /// Turns a raw interaction into an event, or drops it.
    pub fn process(&mut self, raw: RawInteraction) -> Option<RecordedEvent> {
        if let Some(target) = &raw.target {
            if self.is_control_surface(&target.document, target.node) {
                trace!("Dropping interaction on recorder controls");
                return None;
            }
        }

        let locator = raw.target.as_ref().and_then(|t| self.locator_for(t));
        if locator.as_deref().is_some_and(|l| self.is_control_locator(l)) {
            trace!("Dropping interaction on recorder controls");
            return None;
        }

        let target_tag = raw
            .target
            .as_ref()
            .map(|t| t.document.tag(t.node).to_string());
        let payload = to_payload(raw.kind, target_tag);
        let kind = payload.kind();

        if !self.admit(kind, raw.at) {
            trace!(kind = %kind, at = raw.at, "Throttled interaction");
            return None;
        }

        // network traffic never pushes back the next interaction
        if kind != EventKind::Network {
            self.last_emitted_at = Some(raw.at);
        }
        Some(self.emit(raw.at, locator, payload))
    }

    fn admit(&mut self, kind: EventKind, at: i64) -> bool {
        if kind == EventKind::Network {
            return true;
        }

        if kind.is_windowed() {
            let window = self.config.throttle_window_ms as i64;
            if let Some(opened) = self.window_opened_at.get(&kind) {
                if at - opened < window {
                    return false;
                }
            }
            self.window_opened_at.insert(kind, at);
            return true;
        }

        let gap = self.config.min_event_gap_ms as i64;
        match self.last_emitted_at {
            Some(last) => at - last >= gap,
            None => true,
        }
    }

    fn emit(&mut self, at: i64, locator: Option<String>, payload: EventPayload) -> RecordedEvent {
        let event = RecordedEvent {
            sequence: self.next_sequence,
            timestamp: at,
            locator,
            payload,
        };
        self.next_sequence += 1;
        event
    }

    fn locator_for(&self, target: &CapturedTarget) -> Option<String> {
        match self.generator.generate(&target.document, target.node) {
            Ok(locator) => Some(locator),
            Err(e) => {
                trace!(error = %e, "No locator for captured target");
                None
            }
        }
    }

    fn is_control_surface(&self, doc: &Document, node: NodeId) -> bool {
        let prefix = self.config.control_prefix.as_str();
        std::iter::once(node).chain(doc.ancestors(node)).any(|n| {
            let el = doc.element(n);
            el.id().is_some_and(|id| id.starts_with(prefix))
                || el.classes().any(|c| c.starts_with(prefix))
        })
    }

    fn is_control_locator(&self, locator: &str) -> bool {
        let prefix = self.config.control_prefix.as_str();
        locator.contains(&format!("#{prefix}")) || locator.contains(&format!(".{prefix}"))
    }
}

fn to_payload(kind: InteractionKind, target_tag: Option<String>) -> EventPayload {
    match kind {
        InteractionKind::Click { x, y, value } => EventPayload::Click {
            x,
            y,
            target_tag,
            target_value: value,
        },
        InteractionKind::DoubleClick { x, y } => EventPayload::DoubleClick { x, y },
        InteractionKind::Keydown {
            key,
            code,
            modifiers,
        } => EventPayload::Keydown {
            key,
            code,
            modifiers,
        },
        InteractionKind::Input { value } => EventPayload::Input { value },
        InteractionKind::Change { value, checked } => EventPayload::Change { value, checked },
        InteractionKind::Submit { form_data } => EventPayload::Submit { form_data },
        InteractionKind::Scroll { x, y } => EventPayload::Scroll {
            scroll_x: x,
            scroll_y: y,
        },
        InteractionKind::Resize { width, height } => EventPayload::ViewportChange { width, height },
        InteractionKind::Navigate { url, cause } => EventPayload::Navigate { url, cause },
        InteractionKind::Network { method, url, body } => EventPayload::Network {
            method,
            url,
            body: body.map(|b| b.chars().take(MAX_NETWORK_BODY).collect()),
        },
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
