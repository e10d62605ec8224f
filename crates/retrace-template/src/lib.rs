//! # Retrace Template
//!
//! Resolves `{{ name }}` placeholders in recorded values against a
//! recording's custom variables before playback starts.

mod compiler;
mod error;
mod path;
mod unconfigured;

pub use compiler::{CompileReport, TemplateCompiler, token_names};
pub use error::TemplateError;
pub use path::{extract_path, value_to_text};
pub use unconfigured::Unconfigured;
