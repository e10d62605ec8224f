//! Error types for the Retrace protocol layer.

mod locator;
mod playback;
mod provider;
mod recorder;
mod store;
mod surface;

pub use locator::*;
pub use playback::*;
pub use provider::*;
pub use recorder::*;
pub use store::*;
pub use surface::*;
