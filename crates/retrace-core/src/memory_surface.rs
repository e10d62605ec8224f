//! A target surface backed by an in-memory document.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use retrace_protocols::{
    CaptureOptions, CapturedTarget, Document, ElementHandle, InteractionKind, MarkupError, NodeId,
    PageState, RawInteraction, SurfaceAction, SurfaceError, TargetSurface, Viewport,
};
use tokio::sync::mpsc;
use tracing::trace;

/// In-memory [`TargetSurface`].
///
/// Performed actions mutate the document the way a browser would (values,
/// checked state, URL) and are kept in an action log. Interactions fed in
/// through [`MemorySurface::interact`] reach an attached recorder.
pub struct MemorySurface {
    id: String,
    document: RwLock<Document>,
    page: RwLock<PageState>,
    actions: Mutex<Vec<SurfaceAction>>,
    capture: Mutex<Option<mpsc::UnboundedSender<RawInteraction>>>,
    capture_options: Mutex<Option<CaptureOptions>>,
    pending_failures: Mutex<VecDeque<SurfaceError>>,
    reachable: AtomicBool,
}

impl MemorySurface {
    pub fn new(id: impl Into<String>, page: PageState, document: Document) -> Self {
        Self {
            id: id.into(),
            document: RwLock::new(document),
            page: RwLock::new(page),
            actions: Mutex::new(Vec::new()),
            capture: Mutex::new(None),
            capture_options: Mutex::new(None),
            pending_failures: Mutex::new(VecDeque::new()),
            reachable: AtomicBool::new(true),
        }
    }

    /// An empty page at `about:blank`.
    pub fn blank(id: impl Into<String>) -> Self {
        Self::new(
            id,
            PageState {
                url: "about:blank".to_string(),
                ..PageState::default()
            },
            Document::new(),
        )
    }

    /// A page at `url` whose document is parsed from `markup`.
    pub fn from_markup(
        id: impl Into<String>,
        url: impl Into<String>,
        markup: &str,
    ) -> Result<Self, MarkupError> {
        let page = PageState {
            url: url.into(),
            title: String::new(),
            viewport: Viewport {
                width: 1280,
                height: 720,
            },
        };
        Ok(Self::new(id, page, Document::parse(markup)?))
    }

    pub fn url(&self) -> String {
        self.page.read().url.clone()
    }

    /// Copy of the current document.
    pub fn document(&self) -> Document {
        self.document.read().clone()
    }

    /// Node carrying the given `id` attribute.
    pub fn node_by_id(&self, id: &str) -> Option<NodeId> {
        self.document.read().get_element_by_id(id)
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.document.read().attr(node, name).map(str::to_string)
    }

    pub fn actions(&self) -> Vec<SurfaceAction> {
        self.actions.lock().clone()
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.lock().is_some()
    }

    pub fn capture_options(&self) -> Option<CaptureOptions> {
        *self.capture_options.lock()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Makes the next `perform` call fail with `error`.
    pub fn fail_next(&self, error: SurfaceError) {
        self.pending_failures.lock().push_back(error);
    }

    /// Reports an interaction to the attached recorder. Returns false when
    /// nothing is capturing.
    pub fn interact(&self, kind: InteractionKind, target: Option<NodeId>, at: i64) -> bool {
        let target = target.map(|node| CapturedTarget {
            document: Arc::new(self.document()),
            node,
        });
        let capture = self.capture.lock();
        match capture.as_ref() {
            Some(sink) => sink
                .send(RawInteraction { kind, target, at })
                .is_ok(),
            None => false,
        }
    }

    fn ensure_reachable(&self) -> Result<(), SurfaceError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SurfaceError::Unreachable(format!("surface {} is gone", self.id)))
        }
    }

    fn node(&self, handle: ElementHandle) -> Result<NodeId, SurfaceError> {
        self.document
            .read()
            .find_by_handle(handle)
            .ok_or_else(|| SurfaceError::ElementNotFound(format!("node {}", handle.0)))
    }

    fn apply(&self, action: &SurfaceAction) -> Result<(), SurfaceError> {
        match action {
            SurfaceAction::Navigate { url } => {
                self.page.write().url = url.clone();
            }
            SurfaceAction::Click { handle } | SurfaceAction::DoubleClick { handle } => {
                self.node(*handle)?;
            }
            SurfaceAction::Key { handle, .. } => {
                if let Some(handle) = handle {
                    self.node(*handle)?;
                }
            }
            SurfaceAction::SetValue {
                handle,
                value,
                checked,
            } => {
                let node = self.node(*handle)?;
                let mut doc = self.document.write();
                doc.set_attr(node, "value", value);
                match checked {
                    Some(true) => doc.set_attr(node, "checked", ""),
                    Some(false) => {
                        doc.remove_attr(node, "checked");
                    }
                    None => {}
                }
            }
            SurfaceAction::Submit { handle, form_data } => {
                let form = self.node(*handle)?;
                let mut doc = self.document.write();
                let fields: Vec<(NodeId, String)> = doc
                    .subtree(form)
                    .filter(|n| doc.element(*n).is_form_control())
                    .filter_map(|n| doc.attr(n, "name").map(|name| (n, name.to_string())))
                    .collect();
                for (node, name) in fields {
                    if let Some(value) = form_data.get(&name) {
                        doc.set_attr(node, "value", value);
                    }
                }
            }
            SurfaceAction::ScrollTo { .. } => {}
        }
        Ok(())
    }
}

#[async_trait]
impl TargetSurface for MemorySurface {
    fn id(&self) -> &str {
        &self.id
    }

    async fn page_state(&self) -> Result<PageState, SurfaceError> {
        self.ensure_reachable()?;
        Ok(self.page.read().clone())
    }

    async fn handshake(&self) -> Result<(), SurfaceError> {
        self.ensure_reachable()
    }

    async fn snapshot(&self) -> Result<Document, SurfaceError> {
        self.ensure_reachable()?;
        Ok(self.document())
    }

    async fn perform(&self, action: SurfaceAction) -> Result<(), SurfaceError> {
        self.ensure_reachable()?;
        if let Some(error) = self.pending_failures.lock().pop_front() {
            return Err(error);
        }
        self.apply(&action)?;
        trace!(surface_id = %self.id, action = action.name(), "Performed action");
        self.actions.lock().push(action);
        Ok(())
    }

    async fn attach_capture(
        &self,
        options: CaptureOptions,
    ) -> Result<mpsc::UnboundedReceiver<RawInteraction>, SurfaceError> {
        self.ensure_reachable()?;
        let (tx, rx) = mpsc::unbounded_channel();
        *self.capture.lock() = Some(tx);
        *self.capture_options.lock() = Some(options);
        Ok(rx)
    }

    async fn detach_capture(&self) -> Result<(), SurfaceError> {
        self.capture.lock().take();
        Ok(())
    }
}
