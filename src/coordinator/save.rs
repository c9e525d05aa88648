//! Save protocol: write the buffer with the lock token, then announce it.

use remote_docs::BINARY_CONTENT_PLACEHOLDER;

use super::{SaveOutcome, SessionCoordinator};
use crate::bus::BusMessage;
use crate::error::SessionError;
use crate::session::SessionState;

impl SessionCoordinator {
    /// Saves the active session.
    ///
    /// # Errors
    ///
    /// Write failures are reported to the prompter and returned; the session
    /// stays dirty and nothing is retried.
    pub async fn save_active(&self) -> Result<SaveOutcome, SessionError> {
        match self.store.active_path().await {
            Some(path) => self.save(&path).await,
            None => Ok(SaveOutcome::NoActiveSession),
        }
    }

    /// Saves the session for `path`. Same contract as [`save_active`].
    ///
    /// [`save_active`]: Self::save_active
    pub async fn save(&self, path: &str) -> Result<SaveOutcome, SessionError> {
        let result = self.save_session(path).await;
        if let Err(e) = &result {
            tracing::warn!(path, error = %e, "save failed");
            self.prompter.report_error(e);
        }
        result
    }

    pub(super) async fn save_session(&self, path: &str) -> Result<SaveOutcome, SessionError> {
        let session = self
            .store
            .get(path)
            .await
            .ok_or_else(|| SessionError::NotOpen(path.to_string()))?;
        if session.state() != SessionState::EditableDirty {
            tracing::debug!(path, state = %session.state(), "nothing to save");
            return Ok(SaveOutcome::NotDirty);
        }
        if session.content == BINARY_CONTENT_PLACEHOLDER {
            return Err(SessionError::BinaryContent(path.to_string()));
        }
        let token = session
            .lock_token
            .clone()
            .ok_or_else(|| SessionError::NotLocked(path.to_string()))?;

        self.store.update(path, |s| s.saving = true).await;
        let written = session.content;
        let result = self.remote.store(path, &written, &token).await;

        match result {
            Ok(()) => {
                // Edits made while the request was in flight stay dirty.
                self.store
                    .update(path, |s| {
                        s.saving = false;
                        s.flags.stale = false;
                        if s.content == written {
                            s.flags.dirty = false;
                        }
                    })
                    .await;
                tracing::info!(path, bytes = written.len(), "saved");
                self.bus.publish(BusMessage::file_saved(path, &self.owner));
                Ok(SaveOutcome::Saved)
            }
            Err(e) => {
                self.store.update(path, |s| s.saving = false).await;
                Err(SessionError::from_write(path, e))
            }
        }
    }
}
