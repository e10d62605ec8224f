//! Injected capture script and the messages it reports.
//!
//! The script listens on the page and calls the `__retraceCapture` binding
//! with one JSON message per interaction. When an interaction has a target
//! element, the script tags it with [`CAPTURE_MARKER_ATTR`] so the element
//! can be found again in the snapshot taken for that message.

use std::collections::BTreeMap;

use retrace_protocols::{CaptureOptions, InteractionKind, Modifiers, NavigationCause};
use serde::Deserialize;
use serde_json::json;

/// Runtime binding the capture script reports through.
pub const BINDING_NAME: &str = "__retraceCapture";

/// Attribute temporarily set on the target element of an interaction.
pub const CAPTURE_MARKER_ATTR: &str = "data-retrace-capture";

/// Removes the listeners and restores patched globals.
pub const DETACH_SCRIPT: &str =
    "typeof window.__retraceDetach === 'function' && window.__retraceDetach()";

const SCRIPT_TEMPLATE: &str = r#"(() => {
  if (window.__retraceDetach) return;
  const OPTIONS = __OPTIONS__;
  const BINDING = '__BINDING__';
  const MARKER = '__MARKER__';
  const PENDING_SUBMIT = '__retracePendingSubmit';
  let counter = 0;

  const send = (message, target) => {
    const report = window[BINDING];
    if (typeof report !== 'function') return;
    message.at = Date.now();
    if (target && target.nodeType === Node.ELEMENT_NODE) {
      const token = `${Date.now()}-${++counter}`;
      target.setAttribute(MARKER, token);
      message.marker = token;
    }
    report(JSON.stringify(message));
  };

  const formData = (form) => {
    const data = {};
    for (const el of Array.from(form.elements || [])) {
      if (!el.name || el.disabled) continue;
      if ((el.type === 'checkbox' || el.type === 'radio') && !el.checked) continue;
      data[el.name] = String(el.value ?? '');
    }
    return data;
  };

  const checkedOf = (el) =>
    el && (el.type === 'checkbox' || el.type === 'radio') ? !!el.checked : undefined;

  const listeners = [];
  const listen = (target, type, handler) => {
    target.addEventListener(type, handler, true);
    listeners.push([target, type, handler]);
  };

  listen(document, 'click', (e) => send({
    type: 'click', x: e.clientX, y: e.clientY,
    value: e.target && 'value' in e.target ? String(e.target.value) : undefined,
  }, e.target));
  listen(document, 'dblclick', (e) => send({ type: 'dblclick', x: e.clientX, y: e.clientY }, e.target));
  listen(document, 'keydown', (e) => send({
    type: 'keydown', key: e.key, code: e.code || undefined,
    modifiers: { alt: e.altKey, ctrl: e.ctrlKey, shift: e.shiftKey, meta: e.metaKey },
  }, e.target));
  listen(document, 'input', (e) => send({ type: 'input', value: String(e.target.value ?? '') }, e.target));
  listen(document, 'change', (e) => send({
    type: 'change', value: String(e.target.value ?? ''), checked: checkedOf(e.target),
  }, e.target));
  listen(document, 'submit', (e) => {
    try { sessionStorage.setItem(PENDING_SUBMIT, '1'); } catch (_) {}
    send({ type: 'submit', formData: formData(e.target) }, e.target);
  });
  listen(window, 'scroll', () => send({ type: 'scroll', x: window.scrollX, y: window.scrollY }));
  listen(window, 'resize', () => send({ type: 'resize', width: window.innerWidth, height: window.innerHeight }));
  listen(window, 'hashchange', () => send({ type: 'navigate', url: location.href, cause: 'hash-change' }));
  listen(window, 'popstate', () => send({ type: 'navigate', url: location.href, cause: 'history-change' }));

  const restores = [];
  const patch = (owner, name, wrap) => {
    const original = owner[name];
    owner[name] = wrap(original);
    restores.push(() => { owner[name] = original; });
  };

  for (const name of ['pushState', 'replaceState']) {
    patch(history, name, (original) => function (...args) {
      const result = original.apply(this, args);
      send({ type: 'navigate', url: location.href, cause: 'history-change' });
      return result;
    });
  }

  if (OPTIONS.network) {
    patch(window, 'fetch', (original) => function (input, init) {
      const url = typeof input === 'string' ? input : (input && input.url) || String(input);
      const method = ((init && init.method) || (input && input.method) || 'GET').toUpperCase();
      const body = init && typeof init.body === 'string' ? init.body : undefined;
      send({ type: 'network', method, url: new URL(url, location.href).href, body });
      return original.apply(this, arguments);
    });
    const proto = XMLHttpRequest.prototype;
    patch(proto, 'open', (original) => function (method, url, ...rest) {
      this.__retraceRequest = { method: String(method).toUpperCase(), url: new URL(url, location.href).href };
      return original.call(this, method, url, ...rest);
    });
    patch(proto, 'send', (original) => function (body) {
      const request = this.__retraceRequest;
      if (request) {
        send({ type: 'network', method: request.method, url: request.url,
               body: typeof body === 'string' ? body : undefined });
      }
      return original.call(this, body);
    });
  }

  try {
    if (sessionStorage.getItem(PENDING_SUBMIT)) {
      sessionStorage.removeItem(PENDING_SUBMIT);
      send({ type: 'navigate', url: location.href, cause: 'form-navigation' });
    }
  } catch (_) {}

  window.__retraceDetach = () => {
    for (const [target, type, handler] of listeners) target.removeEventListener(type, handler, true);
    for (const restore of restores.reverse()) restore();
    delete window.__retraceDetach;
  };
})()"#;

/// Capture script with the given options baked in.
pub fn capture_script(options: CaptureOptions) -> String {
    let options = json!({ "network": options.intercept_network });
    SCRIPT_TEMPLATE
        .replace("__OPTIONS__", &options.to_string())
        .replace("__BINDING__", BINDING_NAME)
        .replace("__MARKER__", CAPTURE_MARKER_ATTR)
}

/// Removes a marker from the live page.
pub fn clear_marker_script(token: &str) -> String {
    format!(
        "document.querySelectorAll('[{CAPTURE_MARKER_ATTR}=\"{}\"]').forEach(el => el.removeAttribute('{CAPTURE_MARKER_ATTR}'))",
        token.replace(['"', '\'', '\\'], "")
    )
}

/// One message from the capture script.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureMessage {
    #[serde(flatten)]
    pub kind: CapturedKind,
    pub at: i64,
    #[serde(default)]
    pub marker: Option<String>,
}

impl CaptureMessage {
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum CapturedKind {
    Click {
        x: f64,
        y: f64,
        #[serde(default)]
        value: Option<String>,
    },
    #[serde(rename = "dblclick")]
    DoubleClick { x: f64, y: f64 },
    Keydown {
        key: String,
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Input { value: String },
    Change {
        value: String,
        #[serde(default)]
        checked: Option<bool>,
    },
    Submit {
        #[serde(default)]
        form_data: BTreeMap<String, String>,
    },
    Scroll { x: f64, y: f64 },
    Resize { width: u32, height: u32 },
    Navigate { url: String, cause: NavigationCause },
    Network {
        method: String,
        url: String,
        #[serde(default)]
        body: Option<String>,
    },
}

impl From<CapturedKind> for InteractionKind {
    fn from(kind: CapturedKind) -> Self {
        match kind {
            CapturedKind::Click { x, y, value } => Self::Click { x, y, value },
            CapturedKind::DoubleClick { x, y } => Self::DoubleClick { x, y },
            CapturedKind::Keydown {
                key,
                code,
                modifiers,
            } => Self::Keydown {
                key,
                code,
                modifiers,
            },
            CapturedKind::Input { value } => Self::Input { value },
            CapturedKind::Change { value, checked } => Self::Change { value, checked },
            CapturedKind::Submit { form_data } => Self::Submit { form_data },
            CapturedKind::Scroll { x, y } => Self::Scroll { x, y },
            CapturedKind::Resize { width, height } => Self::Resize { width, height },
            CapturedKind::Navigate { url, cause } => Self::Navigate { url, cause },
            CapturedKind::Network { method, url, body } => Self::Network { method, url, body },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_substitutions() {
        let script = capture_script(CaptureOptions {
            intercept_network: true,
        });
        assert!(script.contains(r#"const OPTIONS = {"network":true};"#));
        assert!(script.contains("'__retraceCapture'"));
        assert!(script.contains("'data-retrace-capture'"));
        assert!(!script.contains("__OPTIONS__"));

        let script = capture_script(CaptureOptions::default());
        assert!(script.contains(r#"{"network":false}"#));
    }

    #[test]
    fn test_parse_click_with_marker() {
        let message =
            CaptureMessage::parse(r#"{"type":"click","x":10,"y":20.5,"at":1700,"marker":"1-1"}"#)
                .unwrap();
        assert_eq!(message.at, 1700);
        assert_eq!(message.marker.as_deref(), Some("1-1"));
        assert_eq!(
            InteractionKind::from(message.kind),
            InteractionKind::Click {
                x: 10.0,
                y: 20.5,
                value: None
            }
        );
    }

    #[test]
    fn test_parse_keydown_and_submit() {
        let message = CaptureMessage::parse(
            r#"{"type":"keydown","key":"Enter","code":"Enter","modifiers":{"shift":true},"at":1}"#,
        )
        .unwrap();
        match InteractionKind::from(message.kind) {
            InteractionKind::Keydown { key, modifiers, .. } => {
                assert_eq!(key, "Enter");
                assert!(modifiers.shift);
                assert!(!modifiers.ctrl);
            }
            other => panic!("unexpected kind: {other:?}"),
        }

        let message = CaptureMessage::parse(
            r#"{"type":"submit","formData":{"q":"rust"},"at":2,"marker":"9"}"#,
        )
        .unwrap();
        match InteractionKind::from(message.kind) {
            InteractionKind::Submit { form_data } => assert_eq!(form_data["q"], "rust"),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_parse_navigation_and_network() {
        let message = CaptureMessage::parse(
            r#"{"type":"navigate","url":"https://a.test/#x","cause":"hash-change","at":3}"#,
        )
        .unwrap();
        assert!(message.marker.is_none());
        assert_eq!(
            InteractionKind::from(message.kind),
            InteractionKind::Navigate {
                url: "https://a.test/#x".to_string(),
                cause: NavigationCause::HashChange
            }
        );

        let message = CaptureMessage::parse(
            r#"{"type":"network","method":"POST","url":"https://a.test/api","body":"{}","at":4}"#,
        )
        .unwrap();
        assert!(matches!(
            message.kind,
            CapturedKind::Network { ref method, .. } if method == "POST"
        ));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(CaptureMessage::parse(r#"{"type":"hover","at":1}"#).is_err());
    }

    #[test]
    fn test_clear_marker_script_strips_quotes() {
        let script = clear_marker_script("1'-\"2");
        assert!(script.contains(r#"[data-retrace-capture="1-2"]"#));
    }
}
