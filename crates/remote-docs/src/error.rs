//! Error types for the remote-docs crate.

use thiserror::Error;

/// Errors returned by the lock and content endpoints.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Network(String),

    /// The lock is already held by someone else.
    #[error("Lock already held{}", .owner.as_deref().map(|o| format!(" by {o}")).unwrap_or_default())]
    LockConflict {
        /// Current holder, when the server reports it.
        owner: Option<String>,
    },

    /// The lock token sent with an unlock request is unknown or expired.
    #[error("Lock token is no longer valid (HTTP {0})")]
    InvalidToken(u16),

    /// A content write was refused because the lock credential was rejected.
    #[error("Write rejected by server (HTTP {0})")]
    WriteRejected(u16),

    /// The requested document does not exist.
    #[error("Document not found")]
    NotFound,

    /// The server failed with a 5xx status.
    #[error("Server error (HTTP {0})")]
    Server(u16),

    /// Any other unexpected status code.
    #[error("Unexpected response status: {0}")]
    Unexpected(u16),

    /// The response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The configured base URL or document path could not form a URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl RemoteError {
    /// Returns `true` for failures where the server never answered.
    pub fn is_network(&self) -> bool {
        matches!(self, RemoteError::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_conflict_display_includes_owner() {
        let err = RemoteError::LockConflict {
            owner: Some("bob".to_string()),
        };
        assert_eq!(err.to_string(), "Lock already held by bob");
    }

    #[test]
    fn lock_conflict_display_without_owner() {
        let err = RemoteError::LockConflict { owner: None };
        assert_eq!(err.to_string(), "Lock already held");
    }

    #[test]
    fn write_rejected_display_includes_status() {
        let msg = RemoteError::WriteRejected(412).to_string();
        assert!(msg.contains("412"), "status should appear in: {msg}");
    }

    #[test]
    fn only_network_is_network() {
        assert!(RemoteError::Network("refused".into()).is_network());
        assert!(!RemoteError::Server(503).is_network());
    }
}
