//! Executes [`Command`]s against the recorder, the coordinator and the
//! recording repository.

use std::sync::Arc;

use retrace_config::RecorderConfig;
use retrace_player::PlaybackCoordinator;
use retrace_protocols::{
    CaptureOptions, Command, CommandResponse, PlaybackError, RecordedEvent, Recording,
    RecordingSettings,
};
use retrace_recorder::EventRecorder;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use crate::error::CoreError;
use crate::registry::SurfaceRegistry;
use crate::repository::RecordingRepository;

struct ActiveRecording {
    recorder: EventRecorder,
    events: mpsc::UnboundedReceiver<RecordedEvent>,
    recording: Recording,
}

/// Front door for the command surface.
///
/// At most one recording is in progress at a time. Recording and playback
/// exclude each other per surface: starting one stops the other.
pub struct Controller {
    repository: Arc<RecordingRepository>,
    surfaces: Arc<SurfaceRegistry>,
    coordinator: Arc<PlaybackCoordinator>,
    recorder_config: RecorderConfig,
    active: Mutex<Option<ActiveRecording>>,
}

impl Controller {
    pub fn new(
        repository: Arc<RecordingRepository>,
        surfaces: Arc<SurfaceRegistry>,
        coordinator: Arc<PlaybackCoordinator>,
        recorder_config: RecorderConfig,
    ) -> Self {
        Self {
            repository,
            surfaces,
            coordinator,
            recorder_config,
            active: Mutex::new(None),
        }
    }

    pub fn repository(&self) -> &Arc<RecordingRepository> {
        &self.repository
    }

    pub fn surfaces(&self) -> &Arc<SurfaceRegistry> {
        &self.surfaces
    }

    pub fn coordinator(&self) -> &Arc<PlaybackCoordinator> {
        &self.coordinator
    }

    /// ID of the recording in progress, if any.
    pub async fn active_recording(&self) -> Option<String> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|a| a.recording.id.clone())
    }

    pub async fn execute(&self, command: Command) -> Result<CommandResponse, CoreError> {
        debug!(command = command.name(), "Executing command");
        match command {
            Command::StartRecording {
                name,
                surface_id,
                settings,
            } => self.start_recording(name, &surface_id, settings).await,
            Command::StopRecording => {
                let recording = self.stop_recording().await?;
                Ok(CommandResponse::RecordingStopped {
                    recording_id: recording.id,
                    event_count: recording.events.len(),
                })
            }
            Command::PauseRecording => {
                let active = self.active.lock().await;
                let active = active.as_ref().ok_or(CoreError::NoActiveRecording)?;
                active.recorder.pause()?;
                Ok(CommandResponse::Ack)
            }
            Command::ResumeRecording => {
                let active = self.active.lock().await;
                let active = active.as_ref().ok_or(CoreError::NoActiveRecording)?;
                active.recorder.resume()?;
                Ok(CommandResponse::Ack)
            }
            Command::PlayRecording {
                recording_id,
                surface_id,
                speed,
            } => {
                self.stop_recording_on(&surface_id).await?;
                self.coordinator
                    .play(&recording_id, &surface_id, speed)
                    .await?;
                Ok(CommandResponse::Ack)
            }
            Command::PausePlayback { surface_id } => {
                self.coordinator.pause(&surface_id)?;
                Ok(CommandResponse::Ack)
            }
            Command::ResumePlayback { surface_id } => {
                self.coordinator.resume(&surface_id)?;
                Ok(CommandResponse::Ack)
            }
            Command::StopPlayback { surface_id } => {
                self.coordinator.stop(&surface_id).await?;
                Ok(CommandResponse::Ack)
            }
            Command::SetSpeed {
                surface_id,
                multiplier,
            } => {
                self.coordinator.set_speed(&surface_id, multiplier)?;
                Ok(CommandResponse::Ack)
            }
            Command::GetStatus { surface_id } => Ok(CommandResponse::Status {
                status: self.coordinator.status(&surface_id),
            }),
        }
    }

    async fn start_recording(
        &self,
        name: String,
        surface_id: &str,
        settings: RecordingSettings,
    ) -> Result<CommandResponse, CoreError> {
        let mut active = self.active.lock().await;
        if let Some(current) = active.as_ref() {
            return Err(CoreError::RecordingInProgress(current.recording.id.clone()));
        }
        let surface = self
            .surfaces
            .get(surface_id)
            .ok_or_else(|| CoreError::UnknownSurface(surface_id.to_string()))?;

        if self.coordinator.is_active(surface_id) {
            info!(surface_id, "Stopping playback before recording");
            match self.coordinator.stop(surface_id).await {
                Ok(_) | Err(PlaybackError::NoActiveSession(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let page = surface
            .page_state()
            .await
            .map_err(PlaybackError::from)?;
        let recording = self.repository.draft(name, page.url, settings);
        let options = CaptureOptions {
            intercept_network: recording.settings.flags.xhr_intercept,
        };
        let (recorder, events) = EventRecorder::new(surface, self.recorder_config.clone(), options);
        recorder.start(&recording.id).await?;

        let recording_id = recording.id.clone();
        *active = Some(ActiveRecording {
            recorder,
            events,
            recording,
        });
        Ok(CommandResponse::RecordingStarted { recording_id })
    }

    /// Stops the recording in progress and persists it with every event
    /// the recorder emitted.
    pub async fn stop_recording(&self) -> Result<Recording, CoreError> {
        let active = self
            .active
            .lock()
            .await
            .take()
            .ok_or(CoreError::NoActiveRecording)?;
        self.finish(active).await
    }

    /// Stops the recording in progress if it captures from `surface_id`.
    async fn stop_recording_on(&self, surface_id: &str) -> Result<Option<Recording>, CoreError> {
        let active = {
            let mut active = self.active.lock().await;
            match active.as_ref() {
                Some(a) if a.recorder.surface_id() == surface_id => active.take(),
                _ => None,
            }
        };
        match active {
            Some(active) => {
                info!(surface_id, "Stopping recording before playback");
                self.finish(active).await.map(Some)
            }
            None => Ok(None),
        }
    }

    async fn finish(&self, active: ActiveRecording) -> Result<Recording, CoreError> {
        let ActiveRecording {
            recorder,
            mut events,
            mut recording,
        } = active;
        recorder.stop().await?;

        let mut captured = Vec::new();
        while let Some(event) = events.recv().await {
            captured.push(event);
        }
        recording.events = captured;
        self.repository.save(&recording).await?;
        info!(
            recording_id = %recording.id,
            events = recording.events.len(),
            "Recording saved"
        );
        Ok(recording)
    }

    /// Saves any recording in progress and stops every playback session.
    pub async fn shutdown(&self) -> Result<(), CoreError> {
        let active = self.active.lock().await.take();
        if let Some(active) = active {
            self.finish(active).await?;
        }
        self.coordinator.stop_all().await;
        Ok(())
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
