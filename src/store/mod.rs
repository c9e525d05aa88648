//! Document session store for one tab.
//!
//! Holds the tab's open [`DocumentSession`]s in tab order, keyed by path,
//! together with the active-tab pointer. The store is `Clone` and wraps its
//! state in `Arc<RwLock>` so a renderer can read it while the coordinator
//! mutates it; every mutation is announced on a broadcast channel.

use crate::error::StoreError;
use crate::session::DocumentSession;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

#[cfg(test)]
mod tests;

mod lifecycle;

/// Default capacity for the subscriber notification channel.
const DEFAULT_SUBSCRIBER_CHANNEL_CAPACITY: usize = 256;

/// Change notification sent to store subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreUpdate {
    /// A session was added.
    Opened(String),
    /// A session's content or flags changed.
    Changed(String),
    /// A session was removed.
    Closed(String),
    /// The active tab changed (`None` when no tab remains).
    Activated(Option<String>),
}

#[derive(Debug, Default)]
struct StoreState {
    /// Sessions in tab order. Paths are unique.
    sessions: Vec<DocumentSession>,
    /// Path of the active tab.
    active: Option<String>,
}

impl StoreState {
    fn position(&self, path: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.path == path)
    }
}

/// In-memory collection of a tab's open documents.
///
/// # Example
///
/// ```
/// use tabdoc::store::DocumentStore;
/// use tabdoc::session::DocumentSession;
///
/// #[tokio::main]
/// async fn main() {
///     let store = DocumentStore::new();
///     let session = DocumentSession::read_only("/docs/a.xml", "", "<a/>".to_string());
///     store.insert(session).await.expect("first insert succeeds");
///     assert_eq!(store.active_path().await.as_deref(), Some("/docs/a.xml"));
/// }
/// ```
#[derive(Clone)]
pub struct DocumentStore {
    state: Arc<RwLock<StoreState>>,
    update_tx: broadcast::Sender<StoreUpdate>,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("state", &self.state)
            .field("subscriber_count", &self.update_tx.receiver_count())
            .finish()
    }
}

impl DocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let (update_tx, _rx) = broadcast::channel(DEFAULT_SUBSCRIBER_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            update_tx,
        }
    }

    pub(super) fn notify(&self, update: StoreUpdate) {
        match self.update_tx.send(update) {
            Ok(count) => tracing::trace!("store update sent to {} subscribers", count),
            Err(_) => tracing::trace!("no subscribers for store update"),
        }
    }

    /// Subscribes to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreUpdate> {
        self.update_tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.update_tx.receiver_count()
    }

    /// Returns a copy of the session open for `path`.
    pub async fn get(&self, path: &str) -> Option<DocumentSession> {
        let state = self.state.read().await;
        state.sessions.iter().find(|s| s.path == path).cloned()
    }

    /// Returns `true` if `path` is open.
    pub async fn contains(&self, path: &str) -> bool {
        self.state.read().await.position(path).is_some()
    }

    /// All sessions in tab order.
    pub async fn list_all(&self) -> Vec<DocumentSession> {
        self.state.read().await.sessions.clone()
    }

    /// Paths of all open sessions in tab order.
    pub async fn paths(&self) -> Vec<String> {
        let state = self.state.read().await;
        state.sessions.iter().map(|s| s.path.clone()).collect()
    }

    /// Number of open sessions.
    pub async fn len(&self) -> usize {
        self.state.read().await.sessions.len()
    }

    /// Returns `true` if no session is open.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.sessions.is_empty()
    }

    /// Path of the active tab.
    pub async fn active_path(&self) -> Option<String> {
        self.state.read().await.active.clone()
    }

    /// Copy of the active session.
    pub async fn active(&self) -> Option<DocumentSession> {
        let state = self.state.read().await;
        let active = state.active.as_deref()?;
        state.sessions.iter().find(|s| s.path == active).cloned()
    }

    /// Makes `path` the active tab.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SessionNotFound`] if `path` is not open.
    pub async fn activate(&self, path: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.position(path).is_none() {
            return Err(StoreError::SessionNotFound(path.to_string()));
        }
        if state.active.as_deref() != Some(path) {
            state.active = Some(path.to_string());
            drop(state);
            self.notify(StoreUpdate::Activated(Some(path.to_string())));
        }
        Ok(())
    }

    /// Mutates the session for `path` in place and returns the closure's
    /// result, or `None` if the path is not open.
    ///
    /// Subscribers are told the session changed.
    pub async fn update<F, R>(&self, path: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut DocumentSession) -> R,
    {
        let mut state = self.state.write().await;
        let session = state.sessions.iter_mut().find(|s| s.path == path)?;
        let result = f(session);
        drop(state);
        self.notify(StoreUpdate::Changed(path.to_string()));
        Some(result)
    }

    /// Returns `true` if any session has unsaved edits.
    pub async fn has_dirty(&self) -> bool {
        let state = self.state.read().await;
        state.sessions.iter().any(|s| s.flags.dirty && !s.flags.read_only)
    }

    /// Paths of sessions that are stale and clean, in tab order.
    pub async fn paths_needing_reload(&self) -> Vec<String> {
        let state = self.state.read().await;
        state
            .sessions
            .iter()
            .filter(|s| s.needs_reload())
            .map(|s| s.path.clone())
            .collect()
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}
