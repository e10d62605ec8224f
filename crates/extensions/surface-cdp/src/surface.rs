//! [`TargetSurface`] over a Chrome page.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use retrace_protocols::{
    CaptureOptions, CapturedTarget, Document, NodeId, PageState, RawInteraction, SurfaceAction,
    SurfaceError, TargetSurface, Viewport,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::capture::{
    BINDING_NAME, CAPTURE_MARKER_ATTR, CaptureMessage, DETACH_SCRIPT, capture_script,
    clear_marker_script,
};
use crate::cdp::{BindingCalled, CdpClient, CdpError, CdpResponse, PageInfo, PageSession};
use crate::snapshot::build_document;

const SET_VALUE_FN: &str = r#"function (value, checked) {
  if (this.type === 'checkbox' || this.type === 'radio') {
    if (checked !== null) this.checked = checked;
  } else {
    const descriptor = Object.getOwnPropertyDescriptor(Object.getPrototypeOf(this), 'value');
    if (descriptor && descriptor.set) descriptor.set.call(this, value); else this.value = value;
  }
  this.dispatchEvent(new Event('input', { bubbles: true }));
  this.dispatchEvent(new Event('change', { bubbles: true }));
  return true;
}"#;

const SUBMIT_FN: &str = r#"function (data) {
  const form = this.tagName === 'FORM' ? this : (this.form || this.closest('form'));
  if (!form) throw new Error('element is not inside a form');
  for (const [name, value] of Object.entries(data || {})) {
    const field = form.elements.namedItem(name);
    if (field && 'value' in field) field.value = value;
  }
  if (typeof form.requestSubmit === 'function') form.requestSubmit(); else form.submit();
  return true;
}"#;

const PAGE_STATE_EXPR: &str =
    "({ url: location.href, title: document.title, width: innerWidth, height: innerHeight })";

#[derive(Debug, Deserialize)]
struct RawPageState {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

type CaptureSink = Arc<Mutex<Option<mpsc::UnboundedSender<RawInteraction>>>>;

/// A Chrome page driven over CDP.
pub struct CdpSurface {
    id: String,
    session: Arc<PageSession>,
    capture: CaptureSink,
    script_id: Mutex<Option<String>>,
    shutdown: CancellationToken,
    _client: CdpClient,
}

impl CdpSurface {
    /// Connects to a browser and attaches to one of its pages.
    ///
    /// `target` selects a page by target ID or exact URL; the first page is
    /// used when it is `None`.
    pub async fn connect(
        id: impl Into<String>,
        endpoint: &str,
        target: Option<&str>,
    ) -> Result<Self, SurfaceError> {
        let id = id.into();
        let client = CdpClient::connect(endpoint).await?;
        let pages = client.list_pages().await?;
        let page = pick_page(&pages, target)?;
        info!(surface = %id, url = %page.url, "Attaching to page {}", page.id);

        let session = Arc::new(client.attach_page(&page.id).await?);
        let events = session
            .take_events()
            .ok_or_else(|| SurfaceError::CaptureUnavailable("event stream taken".to_string()))?;

        let capture: CaptureSink = Arc::new(Mutex::new(None));
        let shutdown = CancellationToken::new();
        tokio::spawn(event_loop(
            session.clone(),
            events,
            capture.clone(),
            shutdown.clone(),
        ));

        Ok(Self {
            id,
            session,
            capture,
            script_id: Mutex::new(None),
            shutdown,
            _client: client,
        })
    }

    /// Target ID of the attached page.
    pub fn target_id(&self) -> &str {
        self.session.target_id()
    }

    fn ensure_open(&self) -> Result<(), SurfaceError> {
        if self.session.is_closed() {
            return Err(SurfaceError::Unreachable(format!(
                "connection to {} closed",
                self.id
            )));
        }
        Ok(())
    }

    async fn resolve(&self, handle: i64) -> Result<String, SurfaceError> {
        Ok(self.session.resolve_node(handle).await?)
    }

    async fn center_of(&self, handle: i64) -> Result<(f64, f64), SurfaceError> {
        self.session.scroll_into_view(handle).await?;
        Ok(self.session.element_center(handle).await?)
    }
}

impl Drop for CdpSurface {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl TargetSurface for CdpSurface {
    fn id(&self) -> &str {
        &self.id
    }

    async fn page_state(&self) -> Result<PageState, SurfaceError> {
        self.ensure_open()?;
        let value = self.session.evaluate(PAGE_STATE_EXPR).await?;
        let raw: RawPageState = serde_json::from_value(value)
            .map_err(|e| SurfaceError::ActionFailed(format!("page state: {e}")))?;
        Ok(PageState {
            url: raw.url,
            title: raw.title,
            viewport: Viewport {
                width: raw.width,
                height: raw.height,
            },
        })
    }

    async fn handshake(&self) -> Result<(), SurfaceError> {
        self.ensure_open()?;
        self.session.wait_for_load().await?;
        debug!(surface = %self.id, "Handshake acknowledged");
        Ok(())
    }

    async fn snapshot(&self) -> Result<Document, SurfaceError> {
        self.ensure_open()?;
        let root = self.session.get_document().await?;
        Ok(build_document(&root))
    }

    async fn perform(&self, action: SurfaceAction) -> Result<(), SurfaceError> {
        self.ensure_open()?;
        let name = action.name();
        match action {
            SurfaceAction::Navigate { url } => self.session.navigate(&url).await?,
            SurfaceAction::Click { handle } => {
                let (x, y) = self.center_of(handle.0 as i64).await?;
                self.session.click(x, y, 1).await?;
            }
            SurfaceAction::DoubleClick { handle } => {
                let (x, y) = self.center_of(handle.0 as i64).await?;
                self.session.click(x, y, 2).await?;
            }
            SurfaceAction::Key {
                handle,
                key,
                code,
                modifiers,
            } => {
                if let Some(handle) = handle {
                    self.session.focus(handle.0 as i64).await?;
                }
                self.session
                    .press_key(&key, code.as_deref(), modifiers)
                    .await?;
            }
            SurfaceAction::SetValue {
                handle,
                value,
                checked,
            } => {
                let object_id = self.resolve(handle.0 as i64).await?;
                self.session
                    .call_function_on(&object_id, SET_VALUE_FN, vec![json!(value), json!(checked)])
                    .await?;
            }
            SurfaceAction::Submit { handle, form_data } => {
                let object_id = self.resolve(handle.0 as i64).await?;
                self.session
                    .call_function_on(&object_id, SUBMIT_FN, vec![json!(form_data)])
                    .await?;
            }
            SurfaceAction::ScrollTo { x, y } => {
                self.session
                    .evaluate(&format!("window.scrollTo({x}, {y})"))
                    .await?;
            }
        }
        trace!(surface = %self.id, action = name, "Performed action");
        Ok(())
    }

    async fn attach_capture(
        &self,
        options: CaptureOptions,
    ) -> Result<mpsc::UnboundedReceiver<RawInteraction>, SurfaceError> {
        self.ensure_open()?;
        if self.capture.lock().is_some() {
            return Err(SurfaceError::CaptureUnavailable(format!(
                "{} is already capturing",
                self.id
            )));
        }

        let script = capture_script(options);
        self.session.add_binding(BINDING_NAME).await?;
        let script_id = self.session.add_script_on_new_document(&script).await?;
        self.session.evaluate(&script).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        *self.capture.lock() = Some(tx);
        *self.script_id.lock() = Some(script_id);
        info!(
            surface = %self.id,
            network = options.intercept_network,
            "Capture attached"
        );
        Ok(rx)
    }

    async fn detach_capture(&self) -> Result<(), SurfaceError> {
        // Stop forwarding first so nothing arrives after detach returns.
        self.capture.lock().take();
        let script_id = self.script_id.lock().take();
        if self.session.is_closed() {
            return Ok(());
        }

        self.session.evaluate(DETACH_SCRIPT).await?;
        if let Some(script_id) = script_id {
            self.session
                .remove_script_on_new_document(&script_id)
                .await?;
        }
        self.session.remove_binding(BINDING_NAME).await?;
        info!(surface = %self.id, "Capture detached");
        Ok(())
    }
}

fn pick_page<'a>(pages: &'a [PageInfo], target: Option<&str>) -> Result<&'a PageInfo, CdpError> {
    match target {
        Some(target) => pages
            .iter()
            .find(|p| p.id == target || p.url == target)
            .ok_or_else(|| CdpError::PageNotFound(target.to_string())),
        None => pages
            .first()
            .ok_or_else(|| CdpError::PageNotFound("no open pages".to_string())),
    }
}

/// Strips every capture marker from `doc` and returns the node that carried
/// `token`.
fn take_marked(doc: &mut Document, token: &str) -> Option<NodeId> {
    let marked: Vec<NodeId> = doc
        .iter()
        .filter(|n| doc.attr(*n, CAPTURE_MARKER_ATTR).is_some())
        .collect();
    let mut found = None;
    for node in marked {
        if doc.remove_attr(node, CAPTURE_MARKER_ATTR).as_deref() == Some(token) {
            found = Some(node);
        }
    }
    found
}

async fn locate_target(session: &PageSession, token: &str) -> Option<CapturedTarget> {
    let root = match session.get_document().await {
        Ok(root) => root,
        Err(e) => {
            warn!("Snapshot for captured interaction failed: {}", e);
            return None;
        }
    };
    let mut doc = build_document(&root);
    let node = take_marked(&mut doc, token);
    if let Err(e) = session.evaluate(&clear_marker_script(token)).await {
        debug!("Could not clear capture marker: {}", e);
    }
    node.map(|node| CapturedTarget {
        document: Arc::new(doc),
        node,
    })
}

async fn event_loop(
    session: Arc<PageSession>,
    mut events: mpsc::UnboundedReceiver<CdpResponse>,
    capture: CaptureSink,
    shutdown: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        if event.method.as_deref() != Some("Runtime.bindingCalled") {
            continue;
        }
        let Some(sink) = capture.lock().clone() else {
            continue;
        };
        let binding: BindingCalled = match event.params.map(serde_json::from_value::<BindingCalled>) {
            Some(Ok(binding)) => binding,
            _ => continue,
        };
        if binding.name != BINDING_NAME {
            continue;
        }
        let message = match CaptureMessage::parse(&binding.payload) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping malformed capture message: {}", e);
                continue;
            }
        };

        let target = match &message.marker {
            Some(token) => locate_target(&session, token).await,
            None => None,
        };
        let interaction = RawInteraction {
            kind: message.kind.into(),
            target,
            at: message.at,
        };
        if sink.send(interaction).is_err() {
            trace!("Capture receiver dropped");
        }
    }
    debug!("CDP event loop for {} stopped", session.target_id());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: &str, url: &str) -> PageInfo {
        PageInfo {
            id: id.to_string(),
            page_type: "page".to_string(),
            title: String::new(),
            url: url.to_string(),
            web_socket_debugger_url: None,
        }
    }

    #[test]
    fn test_pick_page() {
        let pages = vec![page("A", "https://a.test/"), page("B", "https://b.test/")];
        assert_eq!(pick_page(&pages, None).unwrap().id, "A");
        assert_eq!(pick_page(&pages, Some("B")).unwrap().id, "B");
        assert_eq!(pick_page(&pages, Some("https://b.test/")).unwrap().id, "B");
        assert!(matches!(
            pick_page(&pages, Some("C")),
            Err(CdpError::PageNotFound(_))
        ));
        assert!(pick_page(&[], None).is_err());
    }

    #[test]
    fn test_take_marked_strips_all_markers() {
        let mut doc = Document::parse(
            r#"<body><button data-retrace-capture="old">a</button><input data-retrace-capture="t-2"></body>"#,
        )
        .unwrap();
        let node = take_marked(&mut doc, "t-2").unwrap();
        assert_eq!(doc.tag(node), "input");
        assert!(doc.iter().all(|n| doc.attr(n, CAPTURE_MARKER_ATTR).is_none()));
        assert!(take_marked(&mut doc, "t-2").is_none());
    }

    #[test]
    fn test_page_state_defaults() {
        let raw: RawPageState = serde_json::from_value(json!({"url": "about:blank"})).unwrap();
        assert_eq!(raw.url, "about:blank");
        assert_eq!(raw.width, 0);
    }
}
