use super::*;
use crate::event::EventPayload;
use serde_json::json;

fn input(sequence: u64, timestamp: i64, value: &str) -> RecordedEvent {
    RecordedEvent::new(
        sequence,
        timestamp,
        EventPayload::Input {
            value: value.to_string(),
        },
    )
}

#[test]
fn test_sorted_events_orders_by_sequence() {
    let recording = Recording::new("rec_1", "demo", "https://example.com").with_events(vec![
        input(3, 300, "c"),
        input(1, 100, "a"),
        input(2, 200, "b"),
    ]);

    let sequences: Vec<u64> = recording.sorted_events().iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    // stored order is untouched
    assert_eq!(recording.events[0].sequence, 3);
}

#[test]
fn test_validate_rejects_empty() {
    let recording = Recording::new("rec_1", "empty", "https://example.com");
    let err = recording.validate().unwrap_err();
    assert!(matches!(err, PlaybackError::InvalidRecording(_)));
}

#[test]
fn test_validate_rejects_duplicate_sequence() {
    let recording = Recording::new("rec_1", "dup", "")
        .with_events(vec![input(1, 100, "a"), input(1, 200, "b")]);
    assert!(recording.validate().is_err());
}

#[test]
fn test_validate_rejects_duplicate_variable() {
    let settings = RecordingSettings {
        flags: RecordingFlags::default(),
        variables: vec![
            CustomVariable::plain("x", "1"),
            CustomVariable::plain("x", "2"),
        ],
    };
    let recording = Recording::new("rec_1", "vars", "")
        .with_events(vec![input(1, 100, "{{x}}")])
        .with_settings(settings);
    assert!(recording.validate().is_err());
}

#[test]
fn test_duration() {
    let recording = Recording::new("rec_1", "d", "")
        .with_events(vec![input(1, 1000, "a"), input(2, 1750, "b")]);
    assert_eq!(recording.duration_ms(), 750);
    assert_eq!(Recording::new("rec_2", "e", "").duration_ms(), 0);
}

#[test]
fn test_deserialize_minimal_recording() {
    let recording: Recording = serde_json::from_value(json!({
        "id": "rec_1",
        "name": "imported",
        "events": [
            {"type": "click", "sequence": 1, "timestamp": 10, "selector": "#a", "x": 1, "y": 2}
        ],
        "settings": {"flags": {"xhrIntercept": true}}
    }))
    .unwrap();

    assert_eq!(recording.events.len(), 1);
    assert!(recording.settings.flags.xhr_intercept);
    assert!(!recording.settings.flags.multi_tab);
    assert!(recording.origin_url.is_empty());
}
