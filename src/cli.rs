//! CLI definitions for Retrace.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Retrace CLI.
#[derive(Parser)]
#[command(name = "retrace")]
#[command(about = "Record browser interactions and replay them")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.retrace/config.toml)
    #[arg(short, long, global = true, env = "RETRACE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Record interactions on a browser page until Ctrl-C
    Record {
        /// Recording name
        #[arg(short, long)]
        name: String,

        /// Page target ID or URL (default: first open page)
        #[arg(short, long)]
        target: Option<String>,

        /// Plain variable stored with the recording, as name=value
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,

        /// Also capture fetch/XHR requests
        #[arg(long)]
        xhr: bool,
    },

    /// Replay a recording, streaming its status
    Play {
        /// Recording ID
        recording_id: String,

        /// Page target ID or URL (default: first open page)
        #[arg(short, long)]
        target: Option<String>,

        /// Speed multiplier (0.1 to 10)
        #[arg(short, long)]
        speed: Option<f64>,
    },

    /// List stored recordings, newest first
    List,

    /// Print a recording as JSON
    Show {
        /// Recording ID
        recording_id: String,
    },

    /// Export a recording to a file or stdout
    Export {
        /// Recording ID
        recording_id: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a recording exported earlier
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },

    /// Delete a recording
    Delete {
        /// Recording ID
        recording_id: String,
    },

    /// Delete every recording
    Clear,
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got '{raw}'")),
    }
}
