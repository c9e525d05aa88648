//! Broadcast notifications for store changes.

use super::{editable, store_with};
use crate::store::{DocumentStore, StoreUpdate};

#[test]
fn test_store_new_has_no_subscribers() {
    let store = DocumentStore::new();
    assert_eq!(store.subscriber_count(), 0);
}

#[test]
fn test_clones_share_subscriber_channel() {
    let store = DocumentStore::new();
    let cloned = store.clone();
    let _rx1 = store.subscribe();
    let _rx2 = cloned.subscribe();
    assert_eq!(store.subscriber_count(), 2);
    assert_eq!(cloned.subscriber_count(), 2);
}

#[tokio::test]
async fn test_insert_announces_open_and_activation() {
    let store = DocumentStore::new();
    let mut rx = store.subscribe();
    store.insert(editable("/a")).await.expect("insert");

    assert_eq!(rx.try_recv().ok(), Some(StoreUpdate::Opened("/a".to_string())));
    assert_eq!(
        rx.try_recv().ok(),
        Some(StoreUpdate::Activated(Some("/a".to_string())))
    );
}

#[tokio::test]
async fn test_update_announces_change() {
    let store = store_with(vec![editable("/a")]).await;
    let mut rx = store.subscribe();
    store.update("/a", |s| s.flags.stale = true).await;
    assert_eq!(rx.try_recv().ok(), Some(StoreUpdate::Changed("/a".to_string())));
}

#[tokio::test]
async fn test_remove_announces_close_and_handover() {
    let store = store_with(vec![editable("/a"), editable("/b")]).await;
    let mut rx = store.subscribe();
    store.remove("/b").await;
    assert_eq!(rx.try_recv().ok(), Some(StoreUpdate::Closed("/b".to_string())));
    assert_eq!(
        rx.try_recv().ok(),
        Some(StoreUpdate::Activated(Some("/a".to_string())))
    );
}

#[tokio::test]
async fn test_reactivating_active_is_silent() {
    let store = store_with(vec![editable("/a")]).await;
    let mut rx = store.subscribe();
    store.activate("/a").await.expect("activate");
    assert!(rx.try_recv().is_err());
}
