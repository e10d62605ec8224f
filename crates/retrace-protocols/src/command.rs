//! Command surface exposed to UI observers and other processes.

use serde::{Deserialize, Serialize};

use crate::recording::RecordingSettings;
use crate::status::PlaybackStatus;

/// A control command. Matched exhaustively by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    StartRecording {
        name: String,
        surface_id: String,
        #[serde(default)]
        settings: RecordingSettings,
    },
    StopRecording,
    PauseRecording,
    ResumeRecording,
    PlayRecording {
        recording_id: String,
        surface_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speed: Option<f64>,
    },
    PausePlayback { surface_id: String },
    ResumePlayback { surface_id: String },
    StopPlayback { surface_id: String },
    SetSpeed { surface_id: String, multiplier: f64 },
    GetStatus { surface_id: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartRecording { .. } => "startRecording",
            Self::StopRecording => "stopRecording",
            Self::PauseRecording => "pauseRecording",
            Self::ResumeRecording => "resumeRecording",
            Self::PlayRecording { .. } => "playRecording",
            Self::PausePlayback { .. } => "pausePlayback",
            Self::ResumePlayback { .. } => "resumePlayback",
            Self::StopPlayback { .. } => "stopPlayback",
            Self::SetSpeed { .. } => "setSpeed",
            Self::GetStatus { .. } => "getStatus",
        }
    }
}

/// Reply to a [`Command`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CommandResponse {
    RecordingStarted { recording_id: String },
    RecordingStopped { recording_id: String, event_count: usize },
    Ack,
    Status { status: PlaybackStatus },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_play_command_from_json() {
        let cmd: Command = serde_json::from_value(json!({
            "action": "playRecording",
            "recordingId": "rec_1",
            "surfaceId": "tab-1"
        }))
        .unwrap();
        assert_eq!(
            cmd,
            Command::PlayRecording {
                recording_id: "rec_1".to_string(),
                surface_id: "tab-1".to_string(),
                speed: None,
            }
        );
        assert_eq!(cmd.name(), "playRecording");
    }

    #[test]
    fn test_unit_command_from_json() {
        let cmd: Command = serde_json::from_value(json!({"action": "stopRecording"})).unwrap();
        assert_eq!(cmd, Command::StopRecording);
    }

    #[test]
    fn test_response_wire_shape() {
        let resp = CommandResponse::RecordingStarted {
            recording_id: "rec_9".to_string(),
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["result"], "recordingStarted");
        assert_eq!(value["recordingId"], "rec_9");
    }
}
