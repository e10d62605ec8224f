//! Key-value persistence protocol.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

/// Last-writer-wins key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the store ID.
    fn id(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// All entries whose key starts with `prefix`, ordered by key.
    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>, StoreError>;
}
