//! Opening and closing sessions in the DocumentStore.

use super::{DocumentStore, StoreUpdate};
use crate::error::StoreError;
use crate::session::DocumentSession;

impl DocumentStore {
    /// Adds a session and makes it the active tab.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SessionExists`] if a session for the same path is
    /// already open; at most one session per path may exist in a tab.
    pub async fn insert(&self, session: DocumentSession) -> Result<(), StoreError> {
        let path = session.path.clone();
        let mut state = self.state.write().await;
        if state.position(&path).is_some() {
            return Err(StoreError::SessionExists(path));
        }
        if session.flags.read_only && session.lock_token.is_some() {
            tracing::warn!(path = %path, "dropping lock token from read-only session");
        }
        let mut session = session;
        if session.flags.read_only {
            session.lock_token = None;
        }
        state.sessions.push(session);
        state.active = Some(path.clone());
        drop(state);

        self.notify(StoreUpdate::Opened(path.clone()));
        self.notify(StoreUpdate::Activated(Some(path)));
        Ok(())
    }

    /// Removes the session for `path`.
    ///
    /// If it was the active tab, the tab to its right becomes active, else
    /// the one to its left, else none. Removing a path that is not open
    /// returns `None`.
    pub async fn remove(&self, path: &str) -> Option<DocumentSession> {
        let mut state = self.state.write().await;
        let index = state.position(path)?;
        let removed = state.sessions.remove(index);

        let was_active = state.active.as_deref() == Some(path);
        if was_active {
            let next = state
                .sessions
                .get(index)
                .or_else(|| index.checked_sub(1).and_then(|i| state.sessions.get(i)))
                .map(|s| s.path.clone());
            state.active = next;
        }
        let active = state.active.clone();
        drop(state);

        self.notify(StoreUpdate::Closed(path.to_string()));
        if was_active {
            self.notify(StoreUpdate::Activated(active));
        }
        Some(removed)
    }

    /// Takes the lock token out of every editable session that holds one.
    ///
    /// Returns `(path, token)` pairs. A second call returns nothing, which
    /// keeps page teardown from unlocking the same session twice.
    pub async fn take_lock_tokens(&self) -> Vec<(String, String)> {
        let mut state = self.state.write().await;
        let taken: Vec<(String, String)> = state
            .sessions
            .iter_mut()
            .filter(|s| !s.flags.read_only)
            .filter_map(|s| s.lock_token.take().map(|t| (s.path.clone(), t)))
            .collect();
        drop(state);

        for (path, _) in &taken {
            self.notify(StoreUpdate::Changed(path.clone()));
        }
        taken
    }
}
