//! Tests for the DocumentStore module.
//!
//! Tests are organized into categories:
//! - `basic`: lookup, update and flag queries
//! - `lifecycle`: insert/remove and active-tab handover
//! - `subscriber`: broadcast notifications

mod basic;
mod subscriber;

use super::DocumentStore;
use crate::session::DocumentSession;

/// Creates an editable session for `path` holding a token derived from it.
pub(super) fn editable(path: &str) -> DocumentSession {
    DocumentSession::editable(path, format!("http://test/content?path={path}"), format!("content of {path}"), format!("token-{path}"))
}

/// Creates a read-only session for `path`.
pub(super) fn read_only(path: &str) -> DocumentSession {
    DocumentSession::read_only(path, format!("http://test/content?path={path}"), format!("content of {path}"))
}

/// Creates a store pre-populated with the given sessions, in order.
pub(super) async fn store_with(sessions: Vec<DocumentSession>) -> DocumentStore {
    let store = DocumentStore::new();
    for session in sessions {
        store.insert(session).await.expect("unique paths");
    }
    store
}
