//! Error types for the session coordinator and its collaborators.

use remote_docs::RemoteError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from [`DocumentStore`](crate::store::DocumentStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A session for this path is already open in the tab.
    #[error("Session already open: {0}")]
    SessionExists(String),

    /// No session is open for this path.
    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

/// Errors from the persisted lock-token cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the cache file failed.
    #[error("Failed to access lock token cache: {path}")]
    Io {
        /// Cache file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Another live tab holds this namespace.
    #[error("Tab id `{namespace}` is already in use by another running tab ({path})")]
    InUse {
        /// Namespace (tab id) requested.
        namespace: String,
        /// Lock file that is held.
        path: PathBuf,
    },

    /// The cache file does not contain a JSON object of strings.
    #[error("Malformed lock token cache {path}: {message}")]
    Parse {
        /// Cache file path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}

/// Errors surfaced by the session coordinator.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The lock is held by another owner (or was taken between query and
    /// acquire).
    #[error("{path} is locked{}", .owner.as_deref().map(|o| format!(" by {o}")).unwrap_or_default())]
    LockUnavailable {
        /// Document path.
        path: String,
        /// Current holder, when known.
        owner: Option<String>,
    },

    /// The server refused the write credential; local edits are kept.
    #[error("Save of {path} rejected (HTTP {status})")]
    WriteRejected {
        /// Document path.
        path: String,
        /// HTTP status of the rejection.
        status: u16,
    },

    /// A lock or content request failed.
    #[error("Request failed: {0}")]
    Transport(#[from] RemoteError),

    /// Releasing a lock failed; recovered by the unlock beacon.
    #[error("Failed to release lock on {path}")]
    UnlockFailure {
        /// Document path.
        path: String,
        /// Underlying request error.
        #[source]
        source: RemoteError,
    },

    /// No session is open for this path.
    #[error("{0} is not open")]
    NotOpen(String),

    /// The session has unsaved edits but no lock token to write with.
    #[error("No lock held for {0}; reopen it to edit")]
    NotLocked(String),

    /// The server could only describe the document as binary; its text
    /// stand-in is never edited or written back.
    #[error("{0} is not a UTF-8 text document; opened read-only")]
    BinaryContent(String),

    /// The store rejected an operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    /// Maps a content-write failure for `path` to the session taxonomy.
    pub fn from_write(path: &str, err: RemoteError) -> Self {
        match err {
            RemoteError::WriteRejected(status) => SessionError::WriteRejected {
                path: path.to_string(),
                status,
            },
            other => SessionError::Transport(other),
        }
    }

    /// Maps an acquire failure for `path` to the session taxonomy.
    pub fn from_acquire(path: &str, err: RemoteError) -> Self {
        match err {
            RemoteError::LockConflict { owner } => SessionError::LockUnavailable {
                path: path.to_string(),
                owner,
            },
            other => SessionError::Transport(other),
        }
    }
}
