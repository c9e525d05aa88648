//! Close, manual refresh, and reloads triggered by other tabs' saves.

use super::{CloseReport, SaveOnClose, SessionCoordinator, UnlockPath};
use crate::error::SessionError;

impl SessionCoordinator {
    /// Closes `path`.
    ///
    /// Unsaved edits are offered for saving first; a failed save is
    /// swallowed. A held lock is then released, falling back to exactly one
    /// unlock beacon. The cached token is cleared whatever happened, and the
    /// active tab moves to a neighbour.
    ///
    /// # Errors
    ///
    /// Only [`SessionError::NotOpen`]; unlock failures are never propagated.
    pub async fn close(&self, path: &str) -> Result<CloseReport, SessionError> {
        let session = self
            .store
            .get(path)
            .await
            .ok_or_else(|| SessionError::NotOpen(path.to_string()))?;

        let save = if session.flags.dirty && !session.flags.read_only {
            if self.prompter.confirm_save_on_close(path) {
                match self.save_session(path).await {
                    Ok(_) => SaveOnClose::Saved,
                    Err(e) => {
                        tracing::warn!(path, error = %e, "save before close failed, discarding");
                        SaveOnClose::Failed
                    }
                }
            } else {
                SaveOnClose::Declined
            }
        } else {
            SaveOnClose::NotNeeded
        };

        let token = if session.flags.read_only {
            None
        } else {
            session.lock_token.clone()
        };
        let unlock = match token {
            Some(token) => self.release_or_beacon(path, &token).await,
            None => {
                self.forget_token(path);
                UnlockPath::NotHeld
            }
        };

        self.store.remove(path).await;
        tracing::info!(path, ?save, ?unlock, "closed");
        Ok(CloseReport {
            path: path.to_string(),
            save,
            unlock,
        })
    }

    /// Reloads `path` from the server on user request.
    ///
    /// Unsaved edits are only discarded after the prompter confirms. Returns
    /// `true` if the buffer was replaced. Transport failures are logged and
    /// leave the session as it was, marked stale.
    pub async fn refresh(&self, path: &str) -> Result<bool, SessionError> {
        let session = self
            .store
            .get(path)
            .await
            .ok_or_else(|| SessionError::NotOpen(path.to_string()))?;
        if session.flags.dirty && !self.prompter.confirm_discard_on_refresh(path) {
            tracing::debug!(path, "refresh declined, keeping local edits");
            return Ok(false);
        }
        Ok(self.reload(path).await)
    }

    /// Reloads `path` unconditionally, dropping local edits.
    pub async fn discard_and_reload(&self, path: &str) -> Result<bool, SessionError> {
        if !self.store.contains(path).await {
            return Err(SessionError::NotOpen(path.to_string()));
        }
        Ok(self.reload(path).await)
    }

    /// Reacts to another tab saving `path`.
    ///
    /// Dirty sessions only become stale; clean ones are refetched. Paths not
    /// open here are ignored, and a repeated message is harmless.
    pub(super) async fn handle_file_saved(&self, path: &str) {
        let Some(session) = self.store.get(path).await else {
            return;
        };
        if session.flags.dirty {
            tracing::info!(path, "saved elsewhere while dirty, marking stale");
            self.store.update(path, |s| s.flags.stale = true).await;
        } else {
            self.reload(path).await;
        }
    }

    /// Refetches `path` and replaces the buffer. On failure the session is
    /// marked stale so the next focus event retries.
    pub(super) async fn reload(&self, path: &str) -> bool {
        match self.remote.fetch(path).await {
            Ok(content) => self
                .store
                .update(path, |s| s.replace_content(content))
                .await
                .is_some(),
            Err(e) => {
                tracing::warn!(path, error = %e, "reload failed, will retry on focus");
                self.store.update(path, |s| s.flags.stale = true).await;
                false
            }
        }
    }
}
