//! Recording and playback commands against a live browser page.

use anyhow::{Result, bail};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use retrace_core::Controller;
use retrace_player::StatusUpdate;
use retrace_protocols::{
    Command, CommandResponse, CustomVariable, PlaybackState, PlaybackStatus, RecordingFlags,
    RecordingSettings,
};

use crate::PAGE_SURFACE_ID;

/// Records until Ctrl-C, then saves the recording.
pub(crate) async fn record(
    controller: &Controller,
    name: String,
    vars: Vec<(String, String)>,
    xhr: bool,
) -> Result<()> {
    let settings = RecordingSettings {
        flags: RecordingFlags {
            xhr_intercept: xhr,
            ..RecordingFlags::default()
        },
        variables: vars
            .into_iter()
            .map(|(name, value)| CustomVariable::plain(name, value))
            .collect(),
    };

    let response = controller
        .execute(Command::StartRecording {
            name,
            surface_id: PAGE_SURFACE_ID.to_string(),
            settings,
        })
        .await?;
    if let CommandResponse::RecordingStarted { recording_id } = response {
        println!("Recording {recording_id}. Press Ctrl-C to stop.");
    }

    tokio::signal::ctrl_c().await?;

    match controller.execute(Command::StopRecording).await? {
        CommandResponse::RecordingStopped {
            recording_id,
            event_count,
        } => println!("Saved {recording_id} with {event_count} events"),
        other => warn!(?other, "Unexpected response to stop"),
    }
    Ok(())
}

/// Replays a recording and prints every status change until it ends.
pub(crate) async fn play(
    controller: &Controller,
    recording_id: &str,
    speed: Option<f64>,
) -> Result<()> {
    let mut updates = controller.coordinator().subscribe();
    controller
        .execute(Command::PlayRecording {
            recording_id: recording_id.to_string(),
            surface_id: PAGE_SURFACE_ID.to_string(),
            speed,
        })
        .await?;

    let final_status = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            controller
                .execute(Command::StopPlayback {
                    surface_id: PAGE_SURFACE_ID.to_string(),
                })
                .await?;
            println!("Playback stopped");
            return Ok(());
        }
        status = follow(&mut updates, PAGE_SURFACE_ID) => match status {
            Some(status) => status,
            None => controller.coordinator().status(PAGE_SURFACE_ID),
        },
    };

    outcome(final_status)
}

/// Prints updates for `surface_id` until its playback stops running.
/// Returns `None` when the feed closes first.
async fn follow(
    updates: &mut broadcast::Receiver<StatusUpdate>,
    surface_id: &str,
) -> Option<PlaybackStatus> {
    loop {
        match updates.recv().await {
            Ok(update) if update.surface_id == surface_id => {
                print_status(&update.status);
                if is_finished(update.status.state) {
                    return Some(update.status);
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(missed)) => warn!(missed, "Status updates dropped"),
            Err(RecvError::Closed) => return None,
        }
    }
}

/// `idle` is reached mid-run when the surface disconnects.
fn is_finished(state: PlaybackState) -> bool {
    state.is_terminal() || state == PlaybackState::Idle
}

fn outcome(status: PlaybackStatus) -> Result<()> {
    match (status.state, status.error_message) {
        (PlaybackState::Error, message) => {
            bail!("Playback failed: {}", message.unwrap_or_default())
        }
        (PlaybackState::Idle, Some(message)) => bail!("Playback interrupted: {message}"),
        _ => Ok(()),
    }
}

fn print_status(status: &PlaybackStatus) {
    let mut line = format!(
        "[{:>3}%] {} {}/{}",
        status.progress, status.state, status.current_event, status.total_events
    );
    if status.retries > 0 {
        line.push_str(&format!(" retries={}", status.retries));
    }
    if status.skipped > 0 {
        line.push_str(&format!(" skipped={}", status.skipped));
    }
    if let Some(message) = &status.error_message {
        line.push_str(&format!(" error={message}"));
    }
    println!("{line}");
}
