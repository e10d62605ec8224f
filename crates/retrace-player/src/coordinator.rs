//! Owns the active playback session of every surface.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use retrace_config::PlaybackConfig;
use retrace_locator::LocatorResolver;
use retrace_protocols::{
    GenerationProvider, JsonFetcher, PlaybackError, PlaybackState, PlaybackStatus, Recording,
    StoreError, TargetSurface,
};
use retrace_template::{TemplateCompiler, Unconfigured};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::engine::{Control, ReplayEngine};
use crate::feed::{StatusFeed, StatusUpdate, UPDATE_CAPACITY};
use crate::session::{PlaybackSession, is_valid_speed};

/// Where recordings are looked up before a session starts.
#[async_trait]
pub trait RecordingSource: Send + Sync {
    async fn recording(&self, id: &str) -> Result<Option<Recording>, StoreError>;
}

/// Where surfaces are looked up by ID.
pub trait SurfaceDirectory: Send + Sync {
    fn surface(&self, id: &str) -> Option<Arc<dyn TargetSurface>>;
}

struct SessionHandle {
    recording_id: String,
    controls: mpsc::UnboundedSender<Control>,
    cancel: CancellationToken,
    status: watch::Receiver<PlaybackStatus>,
    task: Option<JoinHandle<PlaybackStatus>>,
}

impl SessionHandle {
    async fn shutdown(mut self) -> PlaybackStatus {
        self.cancel.cancel();
        match self.task.take() {
            Some(task) => match task.await {
                Ok(status) => status,
                Err(e) => {
                    warn!(error = %e, "Playback task ended abnormally");
                    self.status.borrow().clone()
                }
            },
            None => self.status.borrow().clone(),
        }
    }
}

/// Starts, controls and observes playback sessions, one per surface.
pub struct PlaybackCoordinator {
    recordings: Arc<dyn RecordingSource>,
    surfaces: Arc<dyn SurfaceDirectory>,
    generator: Arc<dyn GenerationProvider>,
    fetcher: Arc<dyn JsonFetcher>,
    resolver: Arc<LocatorResolver>,
    config: PlaybackConfig,
    sessions: Mutex<HashMap<String, SessionHandle>>,
    updates: broadcast::Sender<StatusUpdate>,
}

impl PlaybackCoordinator {
    pub fn new(
        recordings: Arc<dyn RecordingSource>,
        surfaces: Arc<dyn SurfaceDirectory>,
        config: PlaybackConfig,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            recordings,
            surfaces,
            generator: Arc::new(Unconfigured),
            fetcher: Arc::new(Unconfigured),
            resolver: Arc::new(LocatorResolver::default()),
            config,
            sessions: Mutex::new(HashMap::new()),
            updates,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn GenerationProvider>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn JsonFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<LocatorResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Status updates from every session.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.updates.subscribe()
    }

    /// Loads a recording, failing with `RecordingNotFound` when absent.
    pub async fn lookup(&self, recording_id: &str) -> Result<Recording, PlaybackError> {
        self.recordings
            .recording(recording_id)
            .await?
            .ok_or_else(|| PlaybackError::RecordingNotFound(recording_id.to_string()))
    }

    /// Checks that a surface exists, is reachable and may be automated.
    pub async fn validate_surface(
        &self,
        surface_id: &str,
    ) -> Result<Arc<dyn TargetSurface>, PlaybackError> {
        let surface = self
            .surfaces
            .surface(surface_id)
            .ok_or_else(|| PlaybackError::UnknownSurface(surface_id.to_string()))?;
        let page = surface.page_state().await?;
        if self.config.is_restricted(&page.url) {
            return Err(PlaybackError::RestrictedSurface(page.url));
        }
        Ok(surface)
    }

    /// Starts replaying a recording on a surface, replacing any session
    /// already running there. Returns once the session is spawned.
    pub async fn play(
        &self,
        recording_id: &str,
        surface_id: &str,
        speed: Option<f64>,
    ) -> Result<(), PlaybackError> {
        let speed = speed.unwrap_or(self.config.default_speed);
        if !is_valid_speed(speed) {
            return Err(PlaybackError::InvalidSpeed(speed));
        }
        let recording = self.lookup(recording_id).await?;
        recording.validate()?;
        let surface = self.validate_surface(surface_id).await?;

        if let Some(prior) = self.take_session(surface_id) {
            info!(
                surface_id,
                recording_id = %prior.recording_id,
                "Replacing active playback session"
            );
            prior.shutdown().await;
        }

        let session = PlaybackSession::new(&recording, surface_id, speed);
        let (feed, status) = StatusFeed::new(surface_id, self.updates.clone());
        let mut pending = session.status();
        pending.state = PlaybackState::Initializing;
        feed.seed(pending);
        let compiler = TemplateCompiler::new(self.generator.clone(), self.fetcher.clone());
        let engine = ReplayEngine::new(surface, self.config.clone(), feed)
            .with_resolver(self.resolver.clone())
            .with_compiler(compiler);

        let (controls, controls_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let span = info_span!("playback", recording_id, surface_id);
        let task = {
            let cancel = cancel.clone();
            async move {
                let mut session = session;
                engine.run(&mut session, controls_rx, cancel).await
            }
        };
        let task = tokio::spawn(task.instrument(span));

        self.sessions.lock().insert(
            surface_id.to_string(),
            SessionHandle {
                recording_id: recording_id.to_string(),
                controls,
                cancel,
                status,
                task: Some(task),
            },
        );
        debug!(recording_id, surface_id, speed, "Playback session spawned");
        Ok(())
    }

    pub fn pause(&self, surface_id: &str) -> Result<(), PlaybackError> {
        self.send(surface_id, Control::Pause)
    }

    pub fn resume(&self, surface_id: &str) -> Result<(), PlaybackError> {
        self.send(surface_id, Control::Resume)
    }

    pub fn set_speed(&self, surface_id: &str, multiplier: f64) -> Result<(), PlaybackError> {
        if !is_valid_speed(multiplier) {
            return Err(PlaybackError::InvalidSpeed(multiplier));
        }
        self.send(surface_id, Control::SetSpeed(multiplier))
    }

    /// Stops the session on a surface and waits for it to settle in `idle`.
    pub async fn stop(&self, surface_id: &str) -> Result<PlaybackStatus, PlaybackError> {
        let handle = self
            .take_session(surface_id)
            .ok_or_else(|| PlaybackError::NoActiveSession(surface_id.to_string()))?;
        let recording_id = handle.recording_id.clone();
        let status = handle.shutdown().await;

        // Keep the final status visible to `status` callers.
        let (feed, rx) = StatusFeed::new(surface_id, self.updates.clone());
        feed.seed(status.clone());
        let (controls, _) = mpsc::unbounded_channel();
        self.sessions.lock().insert(
            surface_id.to_string(),
            SessionHandle {
                recording_id,
                controls,
                cancel: CancellationToken::new(),
                status: rx,
                task: None,
            },
        );
        Ok(status)
    }

    /// Stops every session.
    pub async fn stop_all(&self) {
        let handles: Vec<SessionHandle> = self.sessions.lock().drain().map(|(_, h)| h).collect();
        for handle in handles {
            handle.shutdown().await;
        }
    }

    /// Latest status on a surface; `idle` when nothing has played there.
    pub fn status(&self, surface_id: &str) -> PlaybackStatus {
        self.sessions
            .lock()
            .get(surface_id)
            .map(|h| h.status.borrow().clone())
            .unwrap_or_else(PlaybackStatus::idle)
    }

    /// Whether a session on the surface is initializing, playing or paused.
    pub fn is_active(&self, surface_id: &str) -> bool {
        self.status(surface_id).state.is_active()
    }

    /// Waits for the session on a surface to finish and returns its final
    /// status.
    pub async fn wait(&self, surface_id: &str) -> Result<PlaybackStatus, PlaybackError> {
        let task = {
            let mut sessions = self.sessions.lock();
            let handle = sessions
                .get_mut(surface_id)
                .ok_or_else(|| PlaybackError::NoActiveSession(surface_id.to_string()))?;
            match handle.task.take() {
                Some(task) => task,
                None => return Ok(handle.status.borrow().clone()),
            }
        };
        match task.await {
            Ok(status) => Ok(status),
            Err(e) => {
                warn!(surface_id, error = %e, "Playback task ended abnormally");
                Ok(self.status(surface_id))
            }
        }
    }

    fn send(&self, surface_id: &str, control: Control) -> Result<(), PlaybackError> {
        // The engine drops its receiver when the session ends.
        let sessions = self.sessions.lock();
        sessions
            .get(surface_id)
            .and_then(|h| h.controls.send(control).ok())
            .ok_or_else(|| PlaybackError::NoActiveSession(surface_id.to_string()))
    }

    fn take_session(&self, surface_id: &str) -> Option<SessionHandle> {
        self.sessions.lock().remove(surface_id)
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
