//! In-process key-value store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use retrace_protocols::{KeyValueStore, StoreError};
use serde_json::Value;

/// [`KeyValueStore`] kept in memory. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn id(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::new();
        store.set("a", json!(1)).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(json!(1)));

        store.set("a", json!(2)).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(json!(2)));

        store.remove("a").await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
        store.remove("a").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_list_by_prefix_is_ordered() {
        let store = MemoryStore::new();
        store.set("rec_2", json!("b")).await.unwrap();
        store.set("settings", json!({})).await.unwrap();
        store.set("rec_1", json!("a")).await.unwrap();
        store.set("re", json!("x")).await.unwrap();

        let keys: Vec<String> = store
            .list_by_prefix("rec_")
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["rec_1", "rec_2"]);
        assert_eq!(store.len(), 4);
    }
}
