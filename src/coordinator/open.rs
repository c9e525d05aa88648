//! Open protocol.
//!
//! 1. `query` the lock.
//! 2. Locked by anyone: open read-only, tell the user who holds it, drop
//!    any cached token for the path.
//! 3. Unlocked: `acquire`, cache the normalized token, fetch, open
//!    editable. A document the server serves as the binary placeholder is
//!    unlocked again and opened read-only.
//!
//! A cached token equal to the live lock's token, held by the caller, is a
//! stray from an earlier run of this tab id: the token cache namespace is
//! claimed exclusively, so no running tab can own it. Such a lock is
//! released and acquired afresh.
//!
//! Between 1 and 3 another tab may take the lock. That race is accepted:
//! the lock service decides, and the losing acquire is surfaced as
//! [`SessionError::LockUnavailable`].

use remote_docs::{LockInfo, RemoteError, BINARY_CONTENT_PLACEHOLDER};

use super::SessionCoordinator;
use crate::error::SessionError;
use crate::prompt::LockHolder;
use crate::session::{DocumentSession, SessionState};

/// Strips control characters, whitespace and markup-like characters from a
/// server-issued lock token (`<opaquelocktoken:..>` becomes
/// `opaquelocktoken:..`).
pub fn normalize_token(raw: &str) -> String {
    raw.chars()
        .filter(|c| {
            !c.is_control() && !c.is_whitespace() && !matches!(c, '<' | '>' | '"' | '\'' | '&')
        })
        .collect()
}

impl SessionCoordinator {
    /// Opens `path` in this tab and makes it active.
    ///
    /// Returns the state the session entered: `EditableClean` when the lock
    /// was acquired, `ReadOnly` when someone (including this user in another
    /// tab) holds it. A path already open in this tab is only activated.
    ///
    /// # Errors
    ///
    /// Failures are reported to the prompter and returned; no session is
    /// created. A lost acquire race yields [`SessionError::LockUnavailable`].
    pub async fn open_file_path(&self, path: &str) -> Result<SessionState, SessionError> {
        if let Some(existing) = self.store.get(path).await {
            self.store.activate(path).await?;
            return Ok(existing.state());
        }
        let result = self.open_remote(path).await;
        match &result {
            Ok(state) => tracing::info!(path, %state, "opened"),
            Err(e) => {
                tracing::warn!(path, error = %e, "open failed");
                self.prompter.report_error(e);
            }
        }
        result
    }

    async fn open_remote(&self, path: &str) -> Result<SessionState, SessionError> {
        let info = self.remote.query(path).await?;
        let cached = self.tokens.get(path);

        if !info.locked {
            if cached.is_some() {
                tracing::debug!(path, "dropping cached token for unlocked path");
                self.forget_token(path);
            }
            return self.open_editable(path).await;
        }

        if let Some(cached) = cached.filter(|c| self.is_own_stray_lock(&info, c)) {
            tracing::info!(path, "releasing stray lock left by an earlier run of this tab");
            match self.remote.release(path, &cached).await {
                Ok(()) | Err(RemoteError::InvalidToken(_)) => {
                    self.forget_token(path);
                    return self.open_editable(path).await;
                }
                Err(e) => {
                    tracing::warn!(path, error = %e, "could not release stray lock");
                }
            }
        }
        self.open_read_only(path, &info).await
    }

    /// A lock counts as this tab's own leftover only if it is held by the
    /// caller under exactly the token this tab cached.
    fn is_own_stray_lock(&self, info: &LockInfo, cached: &str) -> bool {
        info.is_held_by(&self.owner)
            && info.token.as_deref().map(normalize_token).as_deref() == Some(cached)
    }

    async fn open_read_only(&self, path: &str, info: &LockInfo) -> Result<SessionState, SessionError> {
        let holder = LockHolder::classify(info.owner.as_deref(), &self.owner);
        self.prompter.show_locked(path, &holder);
        self.forget_token(path);

        let content = self.remote.fetch(path).await?;
        let session = DocumentSession::read_only(path, self.remote.resolve_url(path), content);
        self.store.insert(session).await?;
        Ok(SessionState::ReadOnly)
    }

    async fn open_editable(&self, path: &str) -> Result<SessionState, SessionError> {
        let grant = self
            .remote
            .acquire(path, &self.owner)
            .await
            .map_err(|e| SessionError::from_acquire(path, e))?;
        let token = normalize_token(&grant.token);
        if token.is_empty() {
            tracing::warn!(path, "lock service issued an empty token");
        }
        if let Err(e) = self.tokens.put(path, &token) {
            tracing::warn!(path, error = %e, "failed to persist lock token");
        }

        let content = match self.remote.fetch(path).await {
            Ok(content) => content,
            Err(e) => {
                self.release_or_beacon(path, &token).await;
                return Err(e.into());
            }
        };
        if content == BINARY_CONTENT_PLACEHOLDER {
            return self.open_binary(path, &token, content).await;
        }

        let mut session =
            DocumentSession::editable(path, self.remote.resolve_url(path), content, token.clone());
        session.lock_timeout = grant.timeout;
        if let Err(e) = self.store.insert(session).await {
            self.release_or_beacon(path, &token).await;
            return Err(e.into());
        }
        Ok(SessionState::EditableClean)
    }

    async fn open_binary(
        &self,
        path: &str,
        token: &str,
        placeholder: String,
    ) -> Result<SessionState, SessionError> {
        tracing::warn!(path, "server sent the binary placeholder, opening read-only");
        self.release_or_beacon(path, token).await;
        let session = DocumentSession::read_only(path, self.remote.resolve_url(path), placeholder);
        self.store.insert(session).await?;
        self.prompter
            .report_error(&SessionError::BinaryContent(path.to_string()));
        Ok(SessionState::ReadOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_token;

    #[test]
    fn strips_angle_brackets() {
        assert_eq!(
            normalize_token("<opaquelocktoken:abc-123>"),
            "opaquelocktoken:abc-123"
        );
    }

    #[test]
    fn strips_control_and_whitespace() {
        assert_eq!(normalize_token(" tok\r\n\t en\u{0}"), "token");
    }

    #[test]
    fn strips_quotes_and_ampersand() {
        assert_eq!(normalize_token("\"a'b&c\""), "abc");
    }

    #[test]
    fn leaves_clean_token_alone() {
        assert_eq!(normalize_token("urn:uuid:1234"), "urn:uuid:1234");
    }
}
