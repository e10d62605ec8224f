use super::*;
use serde_json::json;

#[tokio::test]
async fn test_store_id() {
    let store = SqliteStore::in_memory().await.unwrap();
    assert_eq!(store.id(), "sqlite");
}

#[tokio::test]
async fn test_set_get_overwrite() {
    let store = SqliteStore::in_memory().await.unwrap();
    store
        .set("rec_1", json!({"name": "login", "events": []}))
        .await
        .unwrap();
    assert_eq!(
        store.get("rec_1").await.unwrap(),
        Some(json!({"name": "login", "events": []}))
    );

    store.set("rec_1", json!({"name": "renamed"})).await.unwrap();
    assert_eq!(
        store.get("rec_1").await.unwrap(),
        Some(json!({"name": "renamed"}))
    );
}

#[tokio::test]
async fn test_get_missing() {
    let store = SqliteStore::in_memory().await.unwrap();
    assert!(store.get("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_remove() {
    let store = SqliteStore::in_memory().await.unwrap();
    store.set("rec_1", json!(1)).await.unwrap();
    store.remove("rec_1").await.unwrap();
    assert!(store.get("rec_1").await.unwrap().is_none());
    // removing again is fine
    store.remove("rec_1").await.unwrap();
}

#[tokio::test]
async fn test_list_by_prefix() {
    let store = SqliteStore::in_memory().await.unwrap();
    store.set("rec_2", json!("b")).await.unwrap();
    store.set("rec_1", json!("a")).await.unwrap();
    store.set("rec%", json!("wild")).await.unwrap();
    store.set("settings", json!({})).await.unwrap();

    let entries = store.list_by_prefix("rec_").await.unwrap();
    assert_eq!(
        entries,
        vec![
            ("rec_1".to_string(), json!("a")),
            ("rec_2".to_string(), json!("b")),
        ]
    );
    assert!(store.list_by_prefix("zzz").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_file_backed_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("recordings.db");

    {
        let store = SqliteStore::open(&path).await.unwrap();
        store.set("rec_1", json!({"events": [1, 2, 3]})).await.unwrap();
    }

    let store = SqliteStore::open(&path).await.unwrap();
    assert_eq!(
        store.get("rec_1").await.unwrap(),
        Some(json!({"events": [1, 2, 3]}))
    );
}
