//! # Retrace Recorder
//!
//! Turns raw interactions reported by a [`TargetSurface`] into sequenced
//! [`RecordedEvent`]s.
//!
//! [`TargetSurface`]: retrace_protocols::TargetSurface
//! [`RecordedEvent`]: retrace_protocols::RecordedEvent

mod pipeline;
mod recorder;

pub use pipeline::{CapturePipeline, STOP_MARKER};
pub use recorder::{EventRecorder, RecorderState};
