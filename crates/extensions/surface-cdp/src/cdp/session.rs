//! CDP page session for interacting with a single page.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use retrace_protocols::Modifiers;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::debug;

use super::client::Transport;
use super::error::CdpError;
use super::protocol::{BoxModel, CdpResponse, DomNode, KeyEventType, MouseButton, MouseEventType};

const LOAD_POLL: Duration = Duration::from_millis(100);

/// A session attached to a single page target.
pub struct PageSession {
    target_id: String,
    session_id: String,
    transport: Arc<Transport>,
    events: Mutex<Option<mpsc::UnboundedReceiver<CdpResponse>>>,
}

impl PageSession {
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        transport: Arc<Transport>,
        events: mpsc::UnboundedReceiver<CdpResponse>,
    ) -> Self {
        Self {
            target_id,
            session_id,
            transport,
            events: Mutex::new(Some(events)),
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }

    /// Takes the stream of CDP events for this session. Only the first
    /// caller gets it.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<CdpResponse>> {
        self.events.lock().take()
    }

    /// Send a CDP command to this page session.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.transport
            .call(method, params, Some(&self.session_id))
            .await
    }

    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("DOM.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        debug!("Enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    // ========================================================================
    // Runtime
    // ========================================================================

    /// Evaluate a JavaScript expression and return its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;
        check_exception(&result)?;
        Ok(result["result"]["value"].clone())
    }

    /// Call a function with `this` bound to a remote object.
    pub async fn call_function_on(
        &self,
        object_id: &str,
        function: &str,
        args: Vec<Value>,
    ) -> Result<Value, CdpError> {
        let arguments: Vec<Value> = args.into_iter().map(|v| json!({"value": v})).collect();
        let result = self
            .call(
                "Runtime.callFunctionOn",
                Some(json!({
                    "objectId": object_id,
                    "functionDeclaration": function,
                    "arguments": arguments,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;
        check_exception(&result)?;
        Ok(result["result"]["value"].clone())
    }

    pub async fn add_binding(&self, name: &str) -> Result<(), CdpError> {
        self.call("Runtime.addBinding", Some(json!({"name": name})))
            .await?;
        Ok(())
    }

    pub async fn remove_binding(&self, name: &str) -> Result<(), CdpError> {
        self.call("Runtime.removeBinding", Some(json!({"name": name})))
            .await?;
        Ok(())
    }

    /// Registers a script for every new document and returns its identifier.
    pub async fn add_script_on_new_document(&self, source: &str) -> Result<String, CdpError> {
        let result = self
            .call(
                "Page.addScriptToEvaluateOnNewDocument",
                Some(json!({"source": source})),
            )
            .await?;
        result["identifier"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CdpError::InvalidResponse("Missing script identifier".to_string()))
    }

    pub async fn remove_script_on_new_document(&self, identifier: &str) -> Result<(), CdpError> {
        self.call(
            "Page.removeScriptToEvaluateOnNewDocument",
            Some(json!({"identifier": identifier})),
        )
        .await?;
        Ok(())
    }

    // ========================================================================
    // DOM
    // ========================================================================

    /// Full document tree, shadow roots and iframes included.
    pub async fn get_document(&self) -> Result<DomNode, CdpError> {
        let result = self
            .call("DOM.getDocument", Some(json!({"depth": -1, "pierce": true})))
            .await?;
        Ok(serde_json::from_value(result["root"].clone())?)
    }

    /// Remote object ID for a backend node.
    pub async fn resolve_node(&self, backend_node_id: i64) -> Result<String, CdpError> {
        let result = self
            .call(
                "DOM.resolveNode",
                Some(json!({"backendNodeId": backend_node_id})),
            )
            .await?;
        result["object"]["objectId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CdpError::ElementNotFound(format!("backend node {backend_node_id}")))
    }

    pub async fn scroll_into_view(&self, backend_node_id: i64) -> Result<(), CdpError> {
        self.call(
            "DOM.scrollIntoViewIfNeeded",
            Some(json!({"backendNodeId": backend_node_id})),
        )
        .await?;
        Ok(())
    }

    pub async fn focus(&self, backend_node_id: i64) -> Result<(), CdpError> {
        self.call("DOM.focus", Some(json!({"backendNodeId": backend_node_id})))
            .await?;
        Ok(())
    }

    /// Viewport coordinates of the center of a node's content box.
    pub async fn element_center(&self, backend_node_id: i64) -> Result<(f64, f64), CdpError> {
        let result = self
            .call(
                "DOM.getBoxModel",
                Some(json!({"backendNodeId": backend_node_id})),
            )
            .await?;
        let model: BoxModel = serde_json::from_value(result["model"].clone())?;
        if model.width == 0 && model.height == 0 {
            return Err(CdpError::ElementNotFound(format!(
                "backend node {backend_node_id} has no layout box"
            )));
        }
        Ok(Self::quad_center(&model.content))
    }

    /// Center of a CDP quad (`[x1, y1, x2, y2, x3, y3, x4, y4]`).
    pub fn quad_center(quad: &[f64]) -> (f64, f64) {
        if quad.len() < 8 {
            return (0.0, 0.0);
        }
        let x = (quad[0] + quad[2] + quad[4] + quad[6]) / 4.0;
        let y = (quad[1] + quad[3] + quad[5] + quad[7]) / 4.0;
        (x, y)
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Press and release the left button at a point `click_count` times.
    pub async fn click(&self, x: f64, y: f64, click_count: u32) -> Result<(), CdpError> {
        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": MouseEventType::MouseMoved,
                "x": x,
                "y": y,
                "button": MouseButton::None,
            })),
        )
        .await?;
        for count in 1..=click_count {
            for event in [MouseEventType::MousePressed, MouseEventType::MouseReleased] {
                self.call(
                    "Input.dispatchMouseEvent",
                    Some(json!({
                        "type": event,
                        "x": x,
                        "y": y,
                        "button": MouseButton::Left,
                        "clickCount": count,
                    })),
                )
                .await?;
            }
        }
        debug!("Clicked at ({}, {}) x{}", x, y, click_count);
        Ok(())
    }

    /// Key down and up with modifiers held.
    pub async fn press_key(
        &self,
        key: &str,
        code: Option<&str>,
        modifiers: Modifiers,
    ) -> Result<(), CdpError> {
        let flags = Self::modifier_flags(modifiers);
        for event in [KeyEventType::RawKeyDown, KeyEventType::KeyUp] {
            let mut params = json!({
                "type": event,
                "key": key,
                "modifiers": flags,
            });
            if let Some(code) = code {
                params["code"] = json!(code);
            }
            self.call("Input.dispatchKeyEvent", Some(params)).await?;
        }
        Ok(())
    }

    /// CDP modifier bit field.
    pub fn modifier_flags(modifiers: Modifiers) -> i32 {
        let mut flags = 0;
        if modifiers.alt {
            flags |= 1;
        }
        if modifiers.ctrl {
            flags |= 2;
        }
        if modifiers.meta {
            flags |= 4;
        }
        if modifiers.shift {
            flags |= 8;
        }
        flags
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub async fn navigate(&self, url: &str) -> Result<(), CdpError> {
        let result = self
            .call("Page.navigate", Some(json!({"url": url})))
            .await?;
        if let Some(error) = result.get("errorText").and_then(Value::as_str) {
            return Err(CdpError::JavaScript(format!("navigation to {url} failed: {error}")));
        }
        self.wait_for_load().await?;
        debug!("Navigated to {}", url);
        Ok(())
    }

    /// `document.readyState`.
    pub async fn ready_state(&self) -> Result<String, CdpError> {
        let state = self.evaluate("document.readyState").await?;
        Ok(state.as_str().unwrap_or_default().to_string())
    }

    /// Polls until the document is interactive. Callers bound the wait.
    pub async fn wait_for_load(&self) -> Result<(), CdpError> {
        loop {
            let state = self.ready_state().await?;
            if state == "complete" || state == "interactive" {
                return Ok(());
            }
            tokio::time::sleep(LOAD_POLL).await;
        }
    }
}

fn check_exception(result: &Value) -> Result<(), CdpError> {
    match result.get("exceptionDetails") {
        Some(exception) => {
            let text = exception["exception"]["description"]
                .as_str()
                .or_else(|| exception["text"].as_str())
                .unwrap_or("Unknown error");
            Err(CdpError::JavaScript(text.to_string()))
        }
        None => Ok(()),
    }
}
