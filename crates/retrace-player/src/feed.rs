//! Status fan-out.

use retrace_protocols::PlaybackStatus;
use tokio::sync::{broadcast, watch};

/// Capacity of the coordinator-wide update channel.
pub const UPDATE_CAPACITY: usize = 256;

/// A status change on one surface.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub surface_id: String,
    pub status: PlaybackStatus,
}

/// Publishes a session's status to its latest-value slot and to every
/// observer subscribed to the coordinator.
pub struct StatusFeed {
    surface_id: String,
    latest: watch::Sender<PlaybackStatus>,
    updates: broadcast::Sender<StatusUpdate>,
}

impl StatusFeed {
    pub fn new(
        surface_id: impl Into<String>,
        updates: broadcast::Sender<StatusUpdate>,
    ) -> (Self, watch::Receiver<PlaybackStatus>) {
        let (latest, rx) = watch::channel(PlaybackStatus::idle());
        let feed = Self {
            surface_id: surface_id.into(),
            latest,
            updates,
        };
        (feed, rx)
    }

    /// A feed with no observers besides the returned receiver.
    pub fn detached(surface_id: impl Into<String>) -> (Self, watch::Receiver<PlaybackStatus>) {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self::new(surface_id, updates)
    }

    pub fn surface_id(&self) -> &str {
        &self.surface_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.updates.subscribe()
    }

    pub fn publish(&self, status: PlaybackStatus) {
        self.latest.send_replace(status.clone());
        // No subscribers is fine.
        let _ = self.updates.send(StatusUpdate {
            surface_id: self.surface_id.clone(),
            status,
        });
    }

    /// Sets the latest value without notifying subscribers.
    pub fn seed(&self, status: PlaybackStatus) {
        self.latest.send_replace(status);
    }

    pub fn latest(&self) -> PlaybackStatus {
        self.latest.borrow().clone()
    }
}
