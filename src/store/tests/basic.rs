//! Lookup, in-place update and flag queries.

use super::{editable, read_only, store_with};
use crate::store::DocumentStore;

#[tokio::test]
async fn test_new_store_is_empty() {
    let store = DocumentStore::new();
    assert!(store.is_empty().await);
    assert_eq!(store.len().await, 0);
    assert!(store.active_path().await.is_none());
    assert!(store.active().await.is_none());
}

#[tokio::test]
async fn test_get_returns_copy() {
    let store = store_with(vec![editable("/a.xml")]).await;
    let mut copy = store.get("/a.xml").await.expect("session exists");
    copy.content = "changed".to_string();
    let stored = store.get("/a.xml").await.expect("session exists");
    assert_eq!(stored.content, "content of /a.xml");
}

#[tokio::test]
async fn test_get_missing_returns_none() {
    let store = DocumentStore::new();
    assert!(store.get("/missing").await.is_none());
    assert!(!store.contains("/missing").await);
}

#[tokio::test]
async fn test_update_mutates_in_place() {
    let store = store_with(vec![editable("/a.xml")]).await;
    let accepted = store
        .update("/a.xml", |s| s.apply_edit("edited".to_string()))
        .await;
    assert_eq!(accepted, Some(true));
    let session = store.get("/a.xml").await.expect("session exists");
    assert_eq!(session.content, "edited");
    assert!(session.flags.dirty);
}

#[tokio::test]
async fn test_update_missing_returns_none() {
    let store = DocumentStore::new();
    let result = store.update("/missing", |s| s.flags.stale = true).await;
    assert!(result.is_none());
}

#[tokio::test]
async fn test_has_dirty_ignores_clean_sessions() {
    let store = store_with(vec![editable("/a.xml"), read_only("/b.xml")]).await;
    assert!(!store.has_dirty().await);
    store.update("/a.xml", |s| s.flags.dirty = true).await;
    assert!(store.has_dirty().await);
}

#[tokio::test]
async fn test_paths_needing_reload_skips_dirty() {
    let store = store_with(vec![editable("/a.xml"), editable("/b.xml"), read_only("/c.xml")]).await;
    store
        .update("/a.xml", |s| {
            s.flags.stale = true;
            s.flags.dirty = true;
        })
        .await;
    store.update("/b.xml", |s| s.flags.stale = true).await;
    store.update("/c.xml", |s| s.flags.stale = true).await;

    assert_eq!(
        store.paths_needing_reload().await,
        vec!["/b.xml".to_string(), "/c.xml".to_string()]
    );
}

#[tokio::test]
async fn test_paths_keep_tab_order() {
    let store = store_with(vec![editable("/c"), editable("/a"), editable("/b")]).await;
    assert_eq!(store.paths().await, vec!["/c", "/a", "/b"]);
}

#[tokio::test]
async fn test_debug_includes_subscriber_count() {
    let store = DocumentStore::new();
    let debug_str = format!("{:?}", store);
    assert!(debug_str.contains("DocumentStore"));
    assert!(debug_str.contains("subscriber_count"));
}
