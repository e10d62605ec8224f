//! Target surface protocol.
//!
//! A surface is a page that events are captured from and replayed against.
//! The engine only sees it through [`TargetSurface`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::dom::{Document, ElementHandle, NodeId};
use crate::error::SurfaceError;
use crate::event::{Modifiers, NavigationCause};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// URL, title and viewport of a surface at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageState {
    pub url: String,
    pub title: String,
    pub viewport: Viewport,
}

/// An action the replay engine asks a surface to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceAction {
    Navigate {
        url: String,
    },
    Click {
        handle: ElementHandle,
    },
    DoubleClick {
        handle: ElementHandle,
    },
    Key {
        handle: Option<ElementHandle>,
        key: String,
        code: Option<String>,
        modifiers: Modifiers,
    },
    /// Sets the value (or checked state) and fires `input` and `change`.
    SetValue {
        handle: ElementHandle,
        value: String,
        checked: Option<bool>,
    },
    Submit {
        handle: ElementHandle,
        form_data: BTreeMap<String, String>,
    },
    ScrollTo {
        x: f64,
        y: f64,
    },
}

impl SurfaceAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::Click { .. } => "click",
            Self::DoubleClick { .. } => "dblclick",
            Self::Key { .. } => "key",
            Self::SetValue { .. } => "set-value",
            Self::Submit { .. } => "submit",
            Self::ScrollTo { .. } => "scroll-to",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Also report fetch/XHR traffic.
    pub intercept_network: bool,
}

/// The element an interaction happened on, within the snapshot taken for it.
#[derive(Debug, Clone)]
pub struct CapturedTarget {
    pub document: Arc<Document>,
    pub node: NodeId,
}

/// What a surface observed, before locator generation and sequencing.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionKind {
    Click { x: f64, y: f64, value: Option<String> },
    DoubleClick { x: f64, y: f64 },
    Keydown { key: String, code: Option<String>, modifiers: Modifiers },
    Input { value: String },
    Change { value: String, checked: Option<bool> },
    Submit { form_data: BTreeMap<String, String> },
    Scroll { x: f64, y: f64 },
    Resize { width: u32, height: u32 },
    Navigate { url: String, cause: NavigationCause },
    Network { method: String, url: String, body: Option<String> },
}

/// A raw interaction reported by a surface's capture hooks.
#[derive(Debug, Clone)]
pub struct RawInteraction {
    pub kind: InteractionKind,
    pub target: Option<CapturedTarget>,
    /// Epoch milliseconds on the surface's clock.
    pub at: i64,
}

/// A page that can be observed and driven.
#[async_trait]
pub trait TargetSurface: Send + Sync {
    /// Returns the surface ID.
    fn id(&self) -> &str;

    /// Current URL, title and viewport.
    async fn page_state(&self) -> Result<PageState, SurfaceError>;

    /// Readiness acknowledgment. Must succeed before commands are dispatched.
    async fn handshake(&self) -> Result<(), SurfaceError>;

    /// Snapshot of the element tree.
    async fn snapshot(&self) -> Result<Document, SurfaceError>;

    /// Perform a single action.
    async fn perform(&self, action: SurfaceAction) -> Result<(), SurfaceError>;

    /// Install capture hooks and stream raw interactions.
    async fn attach_capture(
        &self,
        options: CaptureOptions,
    ) -> Result<mpsc::UnboundedReceiver<RawInteraction>, SurfaceError>;

    /// Remove capture hooks and restore anything they replaced.
    async fn detach_capture(&self) -> Result<(), SurfaceError>;
}
