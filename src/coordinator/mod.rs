//! Session coordinator: the per-tab lock and session state machine.
//!
//! The coordinator owns the tab's [`DocumentStore`] and drives every
//! transition of its sessions:
//!
//! ```text
//! CLOSED -> OPENING -> EDITABLE_CLEAN <-> EDITABLE_DIRTY -> SAVING -> EDITABLE_CLEAN
//!                   \-> READ_ONLY
//! any open state -> CLOSED           (stale is orthogonal to all of them)
//! ```
//!
//! User actions are plain async methods. Bus messages and lifecycle signals
//! are queued as [`TabEvent`]s and applied through [`dispatch`], so all
//! transitions live in this module.
//!
//! Error policy: open and save surface failures (returned and reported to
//! the [`Prompter`]); reloads, stale reconciliation and unlock-on-close
//! swallow transport errors and retry on the next trigger.
//!
//! [`dispatch`]: SessionCoordinator::dispatch

use std::sync::Arc;

use remote_docs::{LockInfo, RemoteError};

use crate::bus::{BusMessage, CrossTabBus};
use crate::error::SessionError;
use crate::prompt::Prompter;
use crate::remote::DocumentService;
use crate::store::DocumentStore;
use crate::token_cache::TokenCache;

mod close;
mod events;
mod lifecycle;
mod open;
mod save;

#[cfg(test)]
mod tests;

pub use events::{CloseReport, Dispatch, SaveOnClose, SaveOutcome, TabEvent, UnlockPath};
pub use open::normalize_token;

/// Per-tab coordinator of document sessions and their locks.
pub struct SessionCoordinator {
    owner: String,
    remote: Arc<dyn DocumentService>,
    bus: CrossTabBus,
    tokens: Arc<TokenCache>,
    store: DocumentStore,
    prompter: Arc<dyn Prompter>,
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("owner", &self.owner)
            .field("tab", &self.bus.origin())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl SessionCoordinator {
    /// Creates a coordinator acting for user `owner`.
    ///
    /// The tab id is the bus origin. The token cache and bus are created at
    /// tab start and shared with nothing else in the tab.
    pub fn new(
        owner: impl Into<String>,
        remote: Arc<dyn DocumentService>,
        bus: CrossTabBus,
        tokens: Arc<TokenCache>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        Self {
            owner: owner.into(),
            remote,
            bus,
            tokens,
            store: DocumentStore::new(),
            prompter,
        }
    }

    /// User id locks are requested for.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Id of this tab.
    pub fn tab_id(&self) -> &str {
        self.bus.origin()
    }

    /// The tab's session store.
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// The tab's persisted lock-token cache.
    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    /// The tab's bus handle.
    pub fn bus(&self) -> &CrossTabBus {
        &self.bus
    }

    /// Applies a local edit to `path`.
    ///
    /// Returns `Ok(false)` when the session is read-only; the edit is
    /// rejected and nothing changes.
    pub async fn edit(&self, path: &str, content: impl Into<String>) -> Result<bool, SessionError> {
        let content = content.into();
        let accepted = self
            .store
            .update(path, |s| s.apply_edit(content))
            .await
            .ok_or_else(|| SessionError::NotOpen(path.to_string()))?;
        if !accepted {
            tracing::debug!(path, "edit rejected on read-only session");
        }
        Ok(accepted)
    }

    /// Makes `path` the active tab.
    pub async fn activate(&self, path: &str) -> Result<(), SessionError> {
        self.store.activate(path).await?;
        Ok(())
    }

    /// Current lock snapshot for `path`, straight from the lock service.
    pub async fn lock_info(&self, path: &str) -> Result<LockInfo, SessionError> {
        Ok(self.remote.query(path).await?)
    }

    /// Applies one queued event.
    pub async fn dispatch(&self, event: TabEvent) -> Dispatch {
        match event {
            TabEvent::Bus(message) => {
                self.handle_bus_message(message).await;
                Dispatch::Continue
            }
            TabEvent::Lifecycle(signal) => self.handle_lifecycle(signal).await,
        }
    }

    async fn handle_bus_message(&self, message: BusMessage) {
        match message {
            BusMessage::FileSaved { path, by, time } => {
                tracing::debug!(path = %path, by = %by, time, "file-saved received");
                self.handle_file_saved(&path).await;
            }
        }
    }

    /// Drops the cached token for `path`. Cache failures are logged only.
    fn forget_token(&self, path: &str) {
        if let Err(e) = self.tokens.remove(path) {
            tracing::warn!(path, error = %e, "failed to clear cached lock token");
        }
    }

    /// Releases `token`, falling back to one unlock beacon on failure, and
    /// clears the cached token either way.
    async fn release_or_beacon(&self, path: &str, token: &str) -> UnlockPath {
        let unlock = match self.remote.release(path, token).await {
            Ok(()) => UnlockPath::Released,
            Err(RemoteError::InvalidToken(status)) => {
                tracing::debug!(path, status, "lock already released server-side");
                UnlockPath::AlreadyReleased
            }
            Err(source) => {
                let err = SessionError::UnlockFailure {
                    path: path.to_string(),
                    source,
                };
                tracing::warn!(error = %err, "falling back to unlock beacon");
                self.remote.send_unlock_beacon(path, token);
                UnlockPath::Beacon
            }
        };
        self.forget_token(path);
        unlock
    }
}
