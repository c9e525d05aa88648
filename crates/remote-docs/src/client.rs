//! HTTP client for the lock and content endpoints.
//!
//! Every call is a single request with no retries and no client-side
//! timeout. Status codes are mapped to [`RemoteError`] per endpoint so the
//! caller can tell a lock conflict from a rejected write credential.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::{Response, StatusCode, Url};
use tokio::task::JoinHandle;

use crate::error::RemoteError;
use crate::types::{LockGrant, LockInfo, UnlockRequest};

/// Header carrying the lock token on content writes.
pub const DEFAULT_LOCK_TOKEN_HEADER: &str = "X-Lock-Token";

/// Lock lifetime requested when none is configured.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(1800);

/// Text the content endpoint serves in place of a document that is not
/// valid UTF-8. Storing it back would overwrite the binary original.
pub const BINARY_CONTENT_PLACEHOLDER: &str = "<<BINARY CONTENT (not UTF-8)>>";

/// Client for one remote document service.
///
/// Cheap to clone; clones share the connection pool and the set of
/// in-flight unlock beacons.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base: Url,
    token_header: String,
    lock_timeout: Duration,
    beacons: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Client {
    /// Creates a client for the service rooted at `base_url`.
    ///
    /// A trailing slash is added when missing so that endpoint names are
    /// joined below the base path rather than replacing its last segment.
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base = Url::parse(&normalized).map_err(|e| RemoteError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            token_header: DEFAULT_LOCK_TOKEN_HEADER.to_string(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            beacons: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Overrides the header used to send the lock token on writes.
    pub fn with_token_header(mut self, header: impl Into<String>) -> Self {
        self.token_header = header.into();
        self
    }

    /// Sets the lock lifetime requested on `acquire`, in whole seconds
    /// (at least one).
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout.max(Duration::from_secs(1));
        self
    }

    /// Lock lifetime requested on `acquire`.
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Base URL all endpoints are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Builds `{base}{endpoint}?path=..` plus any extra query pairs.
    pub fn endpoint_url(
        &self,
        endpoint: &str,
        path: &str,
        extra: &[(&str, &str)],
    ) -> Result<Url, RemoteError> {
        let mut url = self
            .base
            .join(endpoint)
            .map_err(|e| RemoteError::InvalidUrl(e.to_string()))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("path", path);
            for (key, value) in extra {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// URL at which the content of `path` is served.
    pub fn content_url(&self, path: &str) -> Result<Url, RemoteError> {
        self.endpoint_url("content", path, &[])
    }

    /// Requests the exclusive lock on `path` for `owner`, asking for the
    /// configured lifetime in `timeout_seconds`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::LockConflict`] when the server answers 409 or
    /// 423 (the lock is held by someone else).
    pub async fn acquire(&self, path: &str, owner: &str) -> Result<LockGrant, RemoteError> {
        let timeout = self.lock_timeout.as_secs().to_string();
        let url = self.endpoint_url(
            "lock",
            path,
            &[("owner", owner), ("timeout_seconds", timeout.as_str())],
        )?;
        let response = self.http.post(url).send().await.map_err(network)?;
        match response.status() {
            s if s.is_success() => decode_json(response).await,
            StatusCode::CONFLICT | StatusCode::LOCKED => {
                let owner = response
                    .json::<LockInfo>()
                    .await
                    .ok()
                    .and_then(|info| info.owner);
                Err(RemoteError::LockConflict { owner })
            }
            s => Err(map_status(s)),
        }
    }

    /// Releases the lock on `path` held under `token`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidToken`] when the server no longer knows
    /// the token; callers usually treat that as already released.
    pub async fn release(&self, path: &str, token: &str) -> Result<(), RemoteError> {
        let url = self.endpoint_url("unlock", path, &[])?;
        let body = UnlockRequest {
            token: token.to_string(),
        };
        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(network)?;
        match response.status() {
            s if s.is_success() => Ok(()),
            s @ (StatusCode::NOT_FOUND
            | StatusCode::CONFLICT
            | StatusCode::GONE
            | StatusCode::PRECONDITION_FAILED) => Err(RemoteError::InvalidToken(s.as_u16())),
            s => Err(map_status(s)),
        }
    }

    /// Point-in-time lock snapshot for `path`.
    pub async fn query(&self, path: &str) -> Result<LockInfo, RemoteError> {
        let url = self.endpoint_url("lockinfo", path, &[])?;
        let response = self.http.get(url).send().await.map_err(network)?;
        match response.status() {
            s if s.is_success() => decode_json(response).await,
            s => Err(map_status(s)),
        }
    }

    /// Downloads the current text of `path`.
    pub async fn fetch(&self, path: &str) -> Result<String, RemoteError> {
        let url = self.content_url(path)?;
        let response = self.http.get(url).send().await.map_err(network)?;
        match response.status() {
            s if s.is_success() => response.text().await.map_err(network),
            s => Err(map_status(s)),
        }
    }

    /// Uploads `content` for `path`, presenting `token` as write credential.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::WriteRejected`] when the credential is refused
    /// (401, 403, 409, 412 or 423).
    pub async fn store(&self, path: &str, content: &str, token: &str) -> Result<(), RemoteError> {
        let url = self.content_url(path)?;
        let response = self
            .http
            .put(url)
            .header(self.token_header.as_str(), token)
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(content.to_string())
            .send()
            .await
            .map_err(network)?;
        match response.status() {
            s if s.is_success() => Ok(()),
            s @ (StatusCode::UNAUTHORIZED
            | StatusCode::FORBIDDEN
            | StatusCode::CONFLICT
            | StatusCode::PRECONDITION_FAILED
            | StatusCode::LOCKED) => Err(RemoteError::WriteRejected(s.as_u16())),
            s => Err(map_status(s)),
        }
    }

    /// Fires an unlock request without waiting for it.
    ///
    /// The request is spawned on the current Tokio runtime and its outcome is
    /// discarded. Outside a runtime the beacon cannot be sent and is dropped
    /// with a warning.
    pub fn send_unlock_beacon(&self, path: &str, token: &str) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(path, "no async runtime, unlock beacon dropped");
            return;
        };
        let url = match self.endpoint_url("unlock", path, &[]) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(path, error = %e, "unlock beacon dropped");
                return;
            }
        };
        let request = self.http.post(url).json(&UnlockRequest {
            token: token.to_string(),
        });
        let task = handle.spawn(async move {
            let _ = request.send().await;
        });

        let mut beacons = self.beacons.lock().unwrap_or_else(|e| e.into_inner());
        beacons.retain(|b| !b.is_finished());
        beacons.push(task);
    }

    /// Waits up to `grace` for in-flight beacons, returning how many were
    /// still pending when the wait began.
    ///
    /// Used at process teardown so beacons are attempted before the runtime
    /// shuts down.
    pub async fn flush_beacons(&self, grace: Duration) -> usize {
        let pending: Vec<JoinHandle<()>> = {
            let mut beacons = self.beacons.lock().unwrap_or_else(|e| e.into_inner());
            beacons.drain(..).filter(|b| !b.is_finished()).collect()
        };
        let count = pending.len();
        if count > 0 {
            let all = async {
                for beacon in pending {
                    let _ = beacon.await;
                }
            };
            if tokio::time::timeout(grace, all).await.is_err() {
                tracing::debug!(count, "unlock beacons still pending after grace period");
            }
        }
        count
    }
}

fn network(e: reqwest::Error) -> RemoteError {
    RemoteError::Network(e.to_string())
}

async fn decode_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let body = response.text().await.map_err(network)?;
    serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))
}

/// Status mapping shared by all endpoints for codes without a specific meaning.
fn map_status(status: StatusCode) -> RemoteError {
    match status.as_u16() {
        404 => RemoteError::NotFound,
        code @ 500..=599 => RemoteError::Server(code),
        code => RemoteError::Unexpected(code),
    }
}
