//! SQLite key-value store implementation.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use serde_json::Value;
use tokio_rusqlite::Connection;
use tracing::debug;

use retrace_protocols::{KeyValueStore, StoreError};

use crate::schema::init_schema;

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

/// SQLite-backed [`KeyValueStore`]. Values are stored as JSON text.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Self::init(conn).await
    }

    /// Open (or create) a file-backed database, creating parent directories
    /// as needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Connection(e.to_string()))?;
        }
        debug!(path = %path.display(), "Opening recording store");
        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.call(|conn| Ok(init_schema(conn)?))
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    fn id(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let key = key.to_string();
        let raw: Option<String> = self
            .conn
            .call(move |conn| {
                let value = conn
                    .query_row("SELECT value FROM entries WHERE key = ?1", [&key], |row| {
                        row.get(0)
                    })
                    .optional()?;
                Ok(value)
            })
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let key = key.to_string();
        let text = serde_json::to_string(&value)?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO entries (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                     updated_at = excluded.updated_at",
                    params![key, text, now],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM entries WHERE key = ?1", [&key])?;
                Ok(())
            })
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let prefix = prefix.to_string();
        let rows: Vec<(String, String)> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT key, value FROM entries
                     WHERE substr(key, 1, length(?1)) = ?1
                     ORDER BY key",
                )?;
                let rows = stmt
                    .query_map([&prefix], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        rows.into_iter()
            .map(|(key, text)| Ok((key, serde_json::from_str(&text)?)))
            .collect()
    }
}
