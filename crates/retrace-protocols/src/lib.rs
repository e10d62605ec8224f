//! # Retrace Protocols
//!
//! Core protocol definitions for the Retrace record/replay engine.
//! Contains wire types and collaborator traits only - no implementations.
//!
//! ## Core Traits
//!
//! - [`TargetSurface`] - A page that events are captured from or replayed against
//! - [`KeyValueStore`] - Persistence collaborator for recordings
//! - [`GenerationProvider`] - Resolves generated variables from a prompt
//! - [`JsonFetcher`] - Fetches JSON documents for remote variables

pub mod command;
pub mod dom;
pub mod error;
pub mod event;
pub mod provider;
pub mod recording;
pub mod status;
pub mod store;
pub mod surface;
pub mod variable;

pub use command::{Command, CommandResponse};
pub use dom::{Document, Element, ElementHandle, MarkupError, NodeId};
pub use error::{
    FetchError, GenerationError, LocatorError, PlaybackError, RecorderError, StoreError,
    SurfaceError,
};
pub use event::{EventKind, EventPayload, Modifiers, NavigationCause, RecordedEvent};
pub use provider::{GenerationProvider, JsonFetcher};
pub use recording::{Recording, RecordingFlags, RecordingSettings};
pub use status::{PlaybackState, PlaybackStatus};
pub use store::KeyValueStore;
pub use surface::{
    CaptureOptions, CapturedTarget, InteractionKind, PageState, RawInteraction, SurfaceAction,
    TargetSurface, Viewport,
};
pub use variable::{CustomVariable, VariableSource};
