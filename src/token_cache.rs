//! Persisted lock-token cache.
//!
//! Remembers, per document path, the last lock token this tab believes it
//! owns, so that a restarted tab can find and release its own stray locks.
//! Entries are hints only: a cached token never proves current ownership
//! and is always reconciled against a fresh `lockinfo` query.
//!
//! The cache is a JSON object `{ "<path>": "<token>" }` written atomically
//! to `<storage>/lock-tokens/<namespace>.json`.
//!
//! A namespace belongs to one live tab at a time. Opening it takes an
//! exclusive advisory lock on `<namespace>.lock` next to the cache file,
//! held until the cache is dropped; a second open while it is held fails
//! with [`CacheError::InUse`]. Any token found in a freshly opened cache was
//! therefore left behind by a tab that is no longer running.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;

use crate::error::CacheError;
use crate::storage;

/// Upper bound on the `<prefix>-<n>` namespaces tried by
/// [`TokenCache::open_free`].
pub const MAX_FREE_SLOTS: usize = 256;

/// Lock tokens keyed by path, at most one per path.
#[derive(Debug)]
pub struct TokenCache {
    file: Option<PathBuf>,
    // Held for the lifetime of the cache; closing the file releases it.
    _claim: Option<File>,
    tokens: Mutex<BTreeMap<String, String>>,
}

impl TokenCache {
    /// A cache that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            file: None,
            _claim: None,
            tokens: Mutex::new(BTreeMap::new()),
        }
    }

    /// Opens the cache for `namespace` under `storage_dir`, claiming the
    /// namespace for this tab.
    ///
    /// A missing file yields an empty cache. A malformed file is discarded
    /// with a warning, since its contents would not be trusted anyway.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InUse`] if another live tab holds the
    /// namespace, and [`CacheError::Io`] if an existing file cannot be read.
    pub fn open(storage_dir: &Path, namespace: &str) -> Result<Self, CacheError> {
        let dir = storage::token_dir(storage_dir);
        let component = storage::file_component(namespace);
        let claim = claim(&dir.join(format!("{component}.lock")), namespace)?;
        let file = dir.join(format!("{component}.json"));
        let tokens = match load(&file) {
            Ok(tokens) => tokens,
            Err(CacheError::Parse { path, message }) => {
                tracing::warn!(path = %path.display(), %message, "discarding malformed lock token cache");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        if !tokens.is_empty() {
            tracing::debug!(count = tokens.len(), "loaded cached lock tokens");
        }
        Ok(Self {
            file: Some(file),
            _claim: Some(claim),
            tokens: Mutex::new(tokens),
        })
    }

    /// Opens the first free namespace among `<prefix>-1`, `<prefix>-2`, ...
    /// and returns its name with the cache.
    ///
    /// Free namespaces are reused, so a tab that crashed leaves its cache to
    /// the next tab started this way, which then reclaims its stray locks.
    ///
    /// # Errors
    ///
    /// Returns the last [`CacheError::InUse`] when all
    /// [`MAX_FREE_SLOTS`] namespaces are live, or any other open failure.
    pub fn open_free(storage_dir: &Path, prefix: &str) -> Result<(String, Self), CacheError> {
        let mut last_err = None;
        for slot in 1..=MAX_FREE_SLOTS {
            let namespace = format!("{prefix}-{slot}");
            match Self::open(storage_dir, &namespace) {
                Ok(cache) => return Ok((namespace, cache)),
                Err(e @ CacheError::InUse { .. }) => last_err = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| CacheError::InUse {
            namespace: prefix.to_string(),
            path: storage::token_dir(storage_dir),
        }))
    }

    /// Backing file, if persisted.
    pub fn file_path(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Cached token for `path`.
    pub fn get(&self, path: &str) -> Option<String> {
        self.lock().get(path).cloned()
    }

    /// Paths with a cached token.
    pub fn paths(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Caches `token` for `path`, replacing any previous token.
    ///
    /// The in-memory entry is updated even if persisting fails.
    pub fn put(&self, path: &str, token: &str) -> Result<(), CacheError> {
        let mut tokens = self.lock();
        tokens.insert(path.to_string(), token.to_string());
        self.persist(&tokens)
    }

    /// Drops the cached token for `path`, returning it.
    ///
    /// The in-memory entry is removed even if persisting fails.
    pub fn remove(&self, path: &str) -> Result<Option<String>, CacheError> {
        let mut tokens = self.lock();
        let removed = tokens.remove(path);
        if removed.is_some() {
            self.persist(&tokens)?;
        }
        Ok(removed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, tokens: &BTreeMap<String, String>) -> Result<(), CacheError> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        let io_err = |source| CacheError::Io {
            path: file.clone(),
            source,
        };
        if tokens.is_empty() {
            return match fs::remove_file(file) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(io_err(e)),
                _ => Ok(()),
            };
        }
        let json = serde_json::to_vec_pretty(tokens).map_err(|e| CacheError::Parse {
            path: file.clone(),
            message: e.to_string(),
        })?;
        storage::write_atomic(file, &json).map_err(io_err)
    }
}

/// Opens `lock_path` and takes an exclusive advisory lock on it without
/// blocking.
fn claim(lock_path: &Path, namespace: &str) -> Result<File, CacheError> {
    let io_err = |source| CacheError::Io {
        path: lock_path.to_path_buf(),
        source,
    };
    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .map_err(io_err)?;
    match file.try_lock_exclusive() {
        Ok(()) => Ok(file),
        Err(e) if e.kind() == fs2::lock_contended_error().kind() => Err(CacheError::InUse {
            namespace: namespace.to_string(),
            path: lock_path.to_path_buf(),
        }),
        Err(e) => Err(io_err(e)),
    }
}

fn load(file: &Path) -> Result<BTreeMap<String, String>, CacheError> {
    let content = match fs::read_to_string(file) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(source) => {
            return Err(CacheError::Io {
                path: file.to_path_buf(),
                source,
            })
        }
    };
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&content).map_err(|e| CacheError::Parse {
        path: file.to_path_buf(),
        message: e.to_string(),
    })
}
