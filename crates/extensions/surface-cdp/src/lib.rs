//! Chrome DevTools Protocol target surface for Retrace.
//!
//! [`CdpSurface`] drives a Chrome page over its remote-debugging websocket:
//! snapshots come from `DOM.getDocument`, actions go through `Input.*` and
//! `Runtime.callFunctionOn`, and capture runs an injected listener script
//! that reports back through a `Runtime.addBinding` channel.
//!
//! Start Chrome with remote debugging first:
//!
//! ```bash
//! chrome --remote-debugging-port=9222
//! ```

pub mod cdp;
mod capture;
mod snapshot;
mod surface;

pub use capture::CAPTURE_MARKER_ATTR;
pub use snapshot::build_document;
pub use surface::CdpSurface;
