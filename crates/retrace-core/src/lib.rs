//! # Retrace Core
//!
//! Wires the recorder and the playback coordinator to persistence and to
//! the set of known surfaces.
//!
//! ## Components
//!
//! - [`Controller`] - Executes [`Command`](retrace_protocols::Command)s
//! - [`RecordingRepository`] - Recording CRUD, export and import
//! - [`SurfaceRegistry`] - Surfaces addressable by ID
//! - [`MemoryStore`] / [`MemorySurface`] - In-process collaborators

pub mod controller;
pub mod error;
pub mod memory_store;
pub mod memory_surface;
pub mod registry;
pub mod repository;

pub use controller::Controller;
pub use error::CoreError;
pub use memory_store::MemoryStore;
pub use memory_surface::MemorySurface;
pub use registry::SurfaceRegistry;
pub use repository::{RECORDING_PREFIX, RecordingRepository, generate_recording_id};
