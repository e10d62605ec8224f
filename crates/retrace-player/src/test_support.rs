//! Scripted surface shared by the player tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use retrace_protocols::{
    CaptureOptions, Document, ElementHandle, PageState, RawInteraction, SurfaceAction,
    SurfaceError, TargetSurface,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

const PAGE: &str = r#"
<html><body>
  <button id="a">A</button>
  <button id="b">B</button>
  <button id="c">C</button>
  <input id="name">
</body></html>
"#;

pub struct ScriptedSurface {
    pub document: Document,
    pub url: Mutex<String>,
    pub performed: Mutex<Vec<(Instant, SurfaceAction)>>,
    pub perform_errors: Mutex<VecDeque<SurfaceError>>,
    pub handshake_error: Mutex<Option<SurfaceError>>,
    pub handshakes: AtomicUsize,
    pub snapshots: AtomicUsize,
}

impl ScriptedSurface {
    pub fn new() -> Self {
        Self {
            document: Document::parse(PAGE).unwrap(),
            url: Mutex::new("https://example.com/".to_string()),
            performed: Mutex::new(Vec::new()),
            perform_errors: Mutex::new(VecDeque::new()),
            handshake_error: Mutex::new(None),
            handshakes: AtomicUsize::new(0),
            snapshots: AtomicUsize::new(0),
        }
    }

    pub fn actions(&self) -> Vec<SurfaceAction> {
        self.performed.lock().iter().map(|(_, a)| a.clone()).collect()
    }

    pub fn with_url(self, url: &str) -> Self {
        *self.url.lock() = url.to_string();
        self
    }

    pub fn handle_of(&self, id: &str) -> ElementHandle {
        let node = self.document.get_element_by_id(id).unwrap();
        self.document.handle(node)
    }
}

#[async_trait]
impl TargetSurface for ScriptedSurface {
    fn id(&self) -> &str {
        "tab-1"
    }

    async fn page_state(&self) -> Result<PageState, SurfaceError> {
        Ok(PageState {
            url: self.url.lock().clone(),
            ..PageState::default()
        })
    }

    async fn handshake(&self) -> Result<(), SurfaceError> {
        self.handshakes.fetch_add(1, Ordering::SeqCst);
        match self.handshake_error.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn snapshot(&self) -> Result<Document, SurfaceError> {
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        Ok(self.document.clone())
    }

    async fn perform(&self, action: SurfaceAction) -> Result<(), SurfaceError> {
        if let Some(e) = self.perform_errors.lock().pop_front() {
            return Err(e);
        }
        if let SurfaceAction::Navigate { url } = &action {
            *self.url.lock() = url.clone();
        }
        self.performed.lock().push((Instant::now(), action));
        Ok(())
    }

    async fn attach_capture(
        &self,
        _options: CaptureOptions,
    ) -> Result<mpsc::UnboundedReceiver<RawInteraction>, SurfaceError> {
        Err(SurfaceError::Unsupported("capture".to_string()))
    }

    async fn detach_capture(&self) -> Result<(), SurfaceError> {
        Ok(())
    }
}

