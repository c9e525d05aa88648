//! Seams between the coordinator and the remote lock and content services.
//!
//! The coordinator only talks to these traits; [`remote_docs::Client`]
//! implements them over HTTP and tests substitute an in-memory service.

use async_trait::async_trait;
use remote_docs::{LockGrant, LockInfo, RemoteError};

/// Remote lock service: the single arbiter of write exclusivity.
#[async_trait]
pub trait LockService: Send + Sync {
    /// Requests the exclusive lock on `path` for `owner`.
    async fn acquire(&self, path: &str, owner: &str) -> Result<LockGrant, RemoteError>;

    /// Releases the lock on `path` held under `token`.
    async fn release(&self, path: &str, token: &str) -> Result<(), RemoteError>;

    /// Point-in-time lock snapshot for `path`.
    async fn query(&self, path: &str) -> Result<LockInfo, RemoteError>;

    /// Best-effort unlock that is never awaited and reports nothing.
    ///
    /// Must return immediately; implementations start the request in the
    /// background and drop its outcome.
    fn send_unlock_beacon(&self, path: &str, token: &str);
}

/// Remote content service.
#[async_trait]
pub trait ContentService: Send + Sync {
    /// Downloads the current text of `path`.
    async fn fetch(&self, path: &str) -> Result<String, RemoteError>;

    /// Uploads `content` for `path` using `token` as write credential.
    async fn store(&self, path: &str, content: &str, token: &str) -> Result<(), RemoteError>;

    /// URL the content of `path` is served from.
    fn resolve_url(&self, path: &str) -> String;
}

/// Both halves of the remote document service.
pub trait DocumentService: LockService + ContentService {}

impl<T: LockService + ContentService + ?Sized> DocumentService for T {}

#[async_trait]
impl LockService for remote_docs::Client {
    async fn acquire(&self, path: &str, owner: &str) -> Result<LockGrant, RemoteError> {
        remote_docs::Client::acquire(self, path, owner).await
    }

    async fn release(&self, path: &str, token: &str) -> Result<(), RemoteError> {
        remote_docs::Client::release(self, path, token).await
    }

    async fn query(&self, path: &str) -> Result<LockInfo, RemoteError> {
        remote_docs::Client::query(self, path).await
    }

    fn send_unlock_beacon(&self, path: &str, token: &str) {
        remote_docs::Client::send_unlock_beacon(self, path, token)
    }
}

#[async_trait]
impl ContentService for remote_docs::Client {
    async fn fetch(&self, path: &str) -> Result<String, RemoteError> {
        remote_docs::Client::fetch(self, path).await
    }

    async fn store(&self, path: &str, content: &str, token: &str) -> Result<(), RemoteError> {
        remote_docs::Client::store(self, path, content, token).await
    }

    fn resolve_url(&self, path: &str) -> String {
        self.content_url(path)
            .map(|url| url.to_string())
            .unwrap_or_default()
    }
}
