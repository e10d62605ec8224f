//! Recording persistence on top of a [`KeyValueStore`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use retrace_player::RecordingSource;
use retrace_protocols::{KeyValueStore, Recording, RecordingSettings, StoreError};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::CoreError;

/// Key prefix shared by every stored recording.
pub const RECORDING_PREFIX: &str = "rec_";

/// Generates a recording ID: `rec_<epoch millis>_<7 random chars>`.
pub fn generate_recording_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{RECORDING_PREFIX}{}_{}",
        Utc::now().timestamp_millis(),
        &random[..7]
    )
}

/// Stores recordings as JSON documents keyed by their ID.
pub struct RecordingRepository {
    store: Arc<dyn KeyValueStore>,
}

impl RecordingRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store_id(&self) -> &str {
        self.store.id()
    }

    /// A new, unsaved recording with a fresh ID.
    pub fn draft(
        &self,
        name: impl Into<String>,
        origin_url: impl Into<String>,
        settings: RecordingSettings,
    ) -> Recording {
        Recording::new(generate_recording_id(), name, origin_url).with_settings(settings)
    }

    pub async fn save(&self, recording: &Recording) -> Result<(), StoreError> {
        let value = serde_json::to_value(recording)?;
        self.store.set(&recording.id, value).await?;
        debug!(
            recording_id = %recording.id,
            events = recording.events.len(),
            "Saved recording"
        );
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Recording>, StoreError> {
        match self.store.get(id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Like [`get`](Self::get), but a missing recording is an error.
    pub async fn require(&self, id: &str) -> Result<Recording, StoreError> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// All recordings, newest first. Entries that fail to parse are skipped.
    pub async fn list(&self) -> Result<Vec<Recording>, StoreError> {
        let entries = self.store.list_by_prefix(RECORDING_PREFIX).await?;
        let mut recordings: Vec<Recording> = entries
            .into_iter()
            .filter_map(|(key, value)| match serde_json::from_value(value) {
                Ok(recording) => Some(recording),
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping unreadable recording");
                    None
                }
            })
            .collect();
        recordings.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(recordings)
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        if self.store.get(id).await?.is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.store.remove(id).await?;
        info!(recording_id = id, "Deleted recording");
        Ok(())
    }

    /// Removes every recording and returns how many were removed.
    pub async fn clear(&self) -> Result<usize, StoreError> {
        let entries = self.store.list_by_prefix(RECORDING_PREFIX).await?;
        for (key, _) in &entries {
            self.store.remove(key).await?;
        }
        info!(removed = entries.len(), "Cleared recordings");
        Ok(entries.len())
    }

    /// Pretty-printed JSON of one recording.
    pub async fn export(&self, id: &str) -> Result<String, StoreError> {
        let recording = self.require(id).await?;
        Ok(serde_json::to_string_pretty(&recording)?)
    }

    /// Imports an exported recording under a fresh ID.
    ///
    /// The document must carry an `id`, a `name` and an `events` array. A
    /// missing creation time is filled with the current time.
    pub async fn import(&self, json: &str) -> Result<Recording, CoreError> {
        let mut value: Value = serde_json::from_str(json).map_err(StoreError::from)?;
        let object = value
            .as_object_mut()
            .ok_or_else(|| CoreError::InvalidImport("expected a JSON object".to_string()))?;

        for field in ["id", "name"] {
            if !object.get(field).is_some_and(Value::is_string) {
                return Err(CoreError::InvalidImport(format!("missing string field `{field}`")));
            }
        }
        if !object.get("events").is_some_and(Value::is_array) {
            return Err(CoreError::InvalidImport("missing `events` array".to_string()));
        }

        let original_id = object
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let id = generate_recording_id();
        object.insert("id".to_string(), Value::String(id.clone()));

        let recording: Recording = serde_json::from_value(value)
            .map_err(|e| CoreError::InvalidImport(e.to_string()))?;
        self.save(&recording).await?;
        info!(
            recording_id = %id,
            original_id = %original_id,
            events = recording.events.len(),
            "Imported recording"
        );
        Ok(recording)
    }
}

#[async_trait]
impl RecordingSource for RecordingRepository {
    async fn recording(&self, id: &str) -> Result<Option<Recording>, StoreError> {
        self.get(id).await
    }
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
