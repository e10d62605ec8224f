//! Retrace - browser interaction recorder and replay engine.
//!
//! Main entry point for the Retrace CLI.

mod cli;
mod cmd_library;
mod cmd_session;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use retrace_config::{Config, ConfigLoader, ConfigValidator, StorageConfig};
use retrace_core::{Controller, MemoryStore, RecordingRepository, SurfaceRegistry};
use retrace_player::PlaybackCoordinator;
use retrace_protocols::KeyValueStore;
use retrace_provider_http::{HttpGenerationProvider, HttpJsonFetcher};
use retrace_store_sqlite::SqliteStore;
use retrace_surface_cdp::CdpSurface;

use cli::{Cli, Commands};

/// Surface ID the CLI registers its browser page under.
pub(crate) const PAGE_SURFACE_ID: &str = "page";

const LOG_FILES_KEPT: usize = 14;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let config = ConfigLoader::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let warnings = ConfigValidator::validate(&config)
        .into_result()
        .context("Invalid configuration")?;
    for warning in warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }

    let store = open_store(&config.storage).await?;
    let repository = Arc::new(RecordingRepository::new(store));
    info!(store = repository.store_id(), "Opened recording store");

    match cli.command {
        Commands::Record {
            name,
            target,
            vars,
            xhr,
        } => {
            let controller = connect(&config, repository, target.as_deref()).await?;
            cmd_session::record(&controller, name, vars, xhr).await
        }
        Commands::Play {
            recording_id,
            target,
            speed,
        } => {
            let controller = connect(&config, repository, target.as_deref()).await?;
            cmd_session::play(&controller, &recording_id, speed).await
        }
        Commands::List => cmd_library::list(&repository).await,
        Commands::Show { recording_id } => cmd_library::show(&repository, &recording_id).await,
        Commands::Export {
            recording_id,
            output,
        } => cmd_library::export(&repository, &recording_id, output.as_deref()).await,
        Commands::Import { file } => cmd_library::import(&repository, &file).await,
        Commands::Delete { recording_id } => {
            cmd_library::delete(&repository, &recording_id).await
        }
        Commands::Clear => cmd_library::clear(&repository).await,
    }
}

/// Get the Retrace home directory (~/.retrace).
fn retrace_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".retrace")
}

fn init_tracing() -> Result<()> {
    let log_dir = retrace_dir().join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("retrace")
        .filename_suffix("log")
        .max_log_files(LOG_FILES_KEPT)
        .build(&log_dir)
        .context("Failed to create log file appender")?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard flushes buffered lines on drop, so it lives as long as the process.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    Ok(())
}

async fn open_store(storage: &StorageConfig) -> Result<Arc<dyn KeyValueStore>> {
    match storage.backend.as_str() {
        "sqlite" => {
            let path = storage.resolved_path();
            let store = SqliteStore::open(&path)
                .await
                .with_context(|| format!("Failed to open recording store {}", path.display()))?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(MemoryStore::new())),
        other => bail!("Unknown storage backend: {other}"),
    }
}

/// Attaches to the browser page and wires a controller around it.
async fn connect(
    config: &Config,
    repository: Arc<RecordingRepository>,
    target: Option<&str>,
) -> Result<Controller> {
    let surface = CdpSurface::connect(PAGE_SURFACE_ID, &config.browser.endpoint, target)
        .await
        .with_context(|| format!("Failed to attach to browser at {}", config.browser.endpoint))?;
    info!(target_id = surface.target_id(), "Attached to browser page");

    let surfaces = Arc::new(SurfaceRegistry::new());
    surfaces.register(Arc::new(surface))?;

    let timeout = Duration::from_secs(config.providers.timeout_seconds);
    let fetcher = HttpJsonFetcher::new(timeout).context("Failed to build HTTP client")?;
    let mut coordinator = PlaybackCoordinator::new(
        repository.clone(),
        surfaces.clone(),
        config.playback.clone(),
    )
    .with_fetcher(Arc::new(fetcher));

    if let Some(url) = &config.providers.generation_url {
        let mut generator = HttpGenerationProvider::new(url.as_str(), timeout)
            .context("Failed to build generation provider")?;
        if let Some(api_key) = &config.providers.api_key {
            generator = generator.with_api_key(api_key.as_str());
        }
        coordinator = coordinator.with_generator(Arc::new(generator));
    }

    Ok(Controller::new(
        repository,
        surfaces,
        Arc::new(coordinator),
        config.recorder.clone(),
    ))
}
