//! Runtime state of one replay.

use std::time::Duration;

use retrace_protocols::{CustomVariable, PlaybackState, PlaybackStatus, RecordedEvent, Recording};

use crate::ledger::RetryLedger;

/// Lowest accepted speed multiplier.
pub const MIN_SPEED: f64 = 0.1;
/// Highest accepted speed multiplier.
pub const MAX_SPEED: f64 = 10.0;

pub fn is_valid_speed(multiplier: f64) -> bool {
    multiplier.is_finite() && (MIN_SPEED..=MAX_SPEED).contains(&multiplier)
}

/// One in-progress replay of a recording against a surface.
///
/// Owned by whoever drives it; the engine only ever borrows it mutably.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub recording_id: String,
    pub surface_id: String,
    pub events: Vec<RecordedEvent>,
    pub variables: Vec<CustomVariable>,
    pub current_index: usize,
    pub state: PlaybackState,
    pub speed: f64,
    pub ledger: RetryLedger,
    pub error_message: Option<String>,
}

impl PlaybackSession {
    pub fn new(recording: &Recording, surface_id: impl Into<String>, speed: f64) -> Self {
        Self {
            recording_id: recording.id.clone(),
            surface_id: surface_id.into(),
            events: recording.sorted_events(),
            variables: recording.settings.variables.clone(),
            current_index: 0,
            state: PlaybackState::Idle,
            speed,
            ledger: RetryLedger::new(),
            error_message: None,
        }
    }

    pub fn total(&self) -> usize {
        self.events.len()
    }

    pub fn current_event(&self) -> Option<&RecordedEvent> {
        self.events.get(self.current_index)
    }

    pub fn is_finished(&self) -> bool {
        self.current_index >= self.events.len()
    }

    /// Delay to wait after dispatching the event at `index`, or `None` for
    /// the last event.
    pub fn delay_after(&self, index: usize, floor: Duration) -> Option<Duration> {
        let current = self.events.get(index)?;
        let next = self.events.get(index + 1)?;
        Some(compute_delay(current, next, self.speed, floor))
    }

    pub fn status(&self) -> PlaybackStatus {
        let mut status = PlaybackStatus::new(self.state, self.current_index, self.total());
        status.error_message = self.error_message.clone();
        status.recording_id = Some(self.recording_id.clone());
        status.retries = self.ledger.failures_at(self.current_index);
        status.skipped = self.ledger.distinct_failed();
        status
    }
}

/// `max(floor, (next.timestamp - current.timestamp) / speed)`.
///
/// Non-positive deltas and invalid speeds collapse to the floor.
pub fn compute_delay(
    current: &RecordedEvent,
    next: &RecordedEvent,
    speed: f64,
    floor: Duration,
) -> Duration {
    let delta_ms = next.timestamp.saturating_sub(current.timestamp);
    if delta_ms <= 0 || !speed.is_finite() || speed <= 0.0 {
        return floor;
    }
    let scaled_ms = (delta_ms as f64 / speed).round() as u64;
    Duration::from_millis(scaled_ms).max(floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrace_protocols::EventPayload;

    fn at(sequence: u64, timestamp: i64) -> RecordedEvent {
        RecordedEvent::new(
            sequence,
            timestamp,
            EventPayload::Scroll {
                scroll_x: 0.0,
                scroll_y: 0.0,
            },
        )
    }

    const FLOOR: Duration = Duration::from_millis(100);

    #[test]
    fn test_delay_scales_with_speed() {
        assert_eq!(compute_delay(&at(1, 1000), &at(2, 1200), 1.0, FLOOR), Duration::from_millis(200));
        assert_eq!(compute_delay(&at(1, 1000), &at(2, 3000), 2.0, FLOOR), Duration::from_millis(1000));
        assert_eq!(compute_delay(&at(1, 0), &at(2, 100), 0.5, FLOOR), Duration::from_millis(200));
    }

    #[test]
    fn test_delay_floor() {
        assert_eq!(compute_delay(&at(1, 1000), &at(2, 1050), 1.0, FLOOR), FLOOR);
        assert_eq!(compute_delay(&at(1, 1000), &at(2, 1000), 1.0, FLOOR), FLOOR);
        assert_eq!(compute_delay(&at(1, 2000), &at(2, 1000), 1.0, FLOOR), FLOOR);
        assert_eq!(compute_delay(&at(1, 0), &at(2, 5000), 0.0, FLOOR), FLOOR);
    }

    #[test]
    fn test_speed_bounds() {
        assert!(is_valid_speed(0.1));
        assert!(is_valid_speed(10.0));
        assert!(is_valid_speed(1.5));
        assert!(!is_valid_speed(0.05));
        assert!(!is_valid_speed(10.5));
        assert!(!is_valid_speed(f64::NAN));
    }

    #[test]
    fn test_status_reflects_ledger() {
        let recording = Recording::new("rec_1", "demo", "https://example.com")
            .with_events(vec![at(1, 0), at(2, 10), at(3, 20), at(4, 30)]);
        let mut session = PlaybackSession::new(&recording, "tab-1", 1.0);
        session.state = PlaybackState::Playing;
        session.current_index = 1;
        session.ledger.record_failure(1);
        session.ledger.record_failure(1);

        let status = session.status();
        assert_eq!(status.progress, 25);
        assert_eq!(status.retries, 2);
        assert_eq!(status.skipped, 0);
        assert_eq!(status.recording_id.as_deref(), Some("rec_1"));
        assert_eq!(session.delay_after(3, FLOOR), None);
    }
}
