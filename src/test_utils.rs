//! In-memory doubles for coordinator tests.
//!
//! [`MemoryService`] plays lock and content server for any number of tabs;
//! clones share one server. [`RecordingPrompter`] answers confirmations from
//! fixed settings and records every dialog.
#![cfg(test)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use remote_docs::{LockGrant, LockInfo, LockTimeout, RemoteError};

use crate::coordinator::normalize_token;
use crate::error::SessionError;
use crate::prompt::{LockHolder, Prompter};
use crate::remote::{ContentService, LockService};

#[derive(Debug, Clone)]
struct HeldLock {
    owner: String,
    token: String,
}

#[derive(Debug, Default)]
struct ServerState {
    locks: HashMap<String, HeldLock>,
    contents: HashMap<String, String>,
    next_token: u64,

    acquires: Vec<String>,
    releases: Vec<(String, String)>,
    beacons: Vec<(String, String)>,
    stores: Vec<(String, String)>,
    fetches: usize,

    fail_query: bool,
    fail_fetch: bool,
    fail_store: bool,
    fail_release: bool,
    /// Next `acquire` loses to this owner, as if it locked after `query`.
    steal_on_acquire: Option<String>,
}

/// Shared in-memory lock and content server.
#[derive(Debug, Clone, Default)]
pub struct MemoryService {
    state: Arc<Mutex<ServerState>>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_document(self, path: &str, content: &str) -> Self {
        self.set_content(path, content);
        self
    }

    pub fn set_content(&self, path: &str, content: &str) {
        self.state()
            .contents
            .insert(path.to_string(), content.to_string());
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.state().contents.get(path).cloned()
    }

    /// Locks `path` for `owner` directly and returns the raw token.
    pub fn lock_as(&self, path: &str, owner: &str) -> String {
        let mut state = self.state();
        state.next_token += 1;
        let token = format!("<opaquelocktoken:{}>", state.next_token);
        state.locks.insert(
            path.to_string(),
            HeldLock {
                owner: owner.to_string(),
                token: token.clone(),
            },
        );
        token
    }

    /// Drops the lock on `path` as if its lease expired.
    pub fn force_release(&self, path: &str) {
        self.state().locks.remove(path);
    }

    pub fn lock_owner(&self, path: &str) -> Option<String> {
        self.state().locks.get(path).map(|l| l.owner.clone())
    }

    pub fn is_locked(&self, path: &str) -> bool {
        self.state().locks.contains_key(path)
    }

    pub fn acquires(&self) -> Vec<String> {
        self.state().acquires.clone()
    }

    pub fn releases(&self) -> Vec<(String, String)> {
        self.state().releases.clone()
    }

    pub fn beacons(&self) -> Vec<(String, String)> {
        self.state().beacons.clone()
    }

    pub fn stores(&self) -> Vec<(String, String)> {
        self.state().stores.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.state().fetches
    }

    pub fn fail_query(&self, fail: bool) {
        self.state().fail_query = fail;
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.state().fail_fetch = fail;
    }

    pub fn fail_store(&self, fail: bool) {
        self.state().fail_store = fail;
    }

    pub fn fail_release(&self, fail: bool) {
        self.state().fail_release = fail;
    }

    pub fn steal_next_acquire(&self, owner: &str) {
        self.state().steal_on_acquire = Some(owner.to_string());
    }

    fn holds(lock: &HeldLock, token: &str) -> bool {
        normalize_token(&lock.token) == normalize_token(token)
    }
}

fn offline() -> RemoteError {
    RemoteError::Network("connection refused".to_string())
}

#[async_trait]
impl LockService for MemoryService {
    async fn acquire(&self, path: &str, owner: &str) -> Result<LockGrant, RemoteError> {
        let thief = {
            let mut state = self.state();
            state.acquires.push(path.to_string());
            state.steal_on_acquire.take()
        };
        if let Some(thief) = thief {
            self.lock_as(path, &thief);
        }
        if let Some(owner) = self.lock_owner(path) {
            return Err(RemoteError::LockConflict { owner: Some(owner) });
        }
        let token = self.lock_as(path, owner);
        Ok(LockGrant {
            token,
            owner: owner.to_string(),
            timeout: Some(LockTimeout::Seconds(600)),
        })
    }

    async fn release(&self, path: &str, token: &str) -> Result<(), RemoteError> {
        let mut state = self.state();
        if state.fail_release {
            return Err(offline());
        }
        match state.locks.get(path) {
            Some(lock) if Self::holds(lock, token) => {
                state.locks.remove(path);
                state.releases.push((path.to_string(), token.to_string()));
                Ok(())
            }
            _ => Err(RemoteError::InvalidToken(412)),
        }
    }

    async fn query(&self, path: &str) -> Result<LockInfo, RemoteError> {
        let state = self.state();
        if state.fail_query {
            return Err(offline());
        }
        Ok(match state.locks.get(path) {
            Some(lock) => LockInfo {
                locked: true,
                owner: Some(lock.owner.clone()),
                token: Some(lock.token.clone()),
            },
            None => LockInfo::unlocked(),
        })
    }

    fn send_unlock_beacon(&self, path: &str, token: &str) {
        let mut state = self.state();
        state.beacons.push((path.to_string(), token.to_string()));
        let matches = state
            .locks
            .get(path)
            .is_some_and(|lock| Self::holds(lock, token));
        if matches {
            state.locks.remove(path);
        }
    }
}

#[async_trait]
impl ContentService for MemoryService {
    async fn fetch(&self, path: &str) -> Result<String, RemoteError> {
        let mut state = self.state();
        if state.fail_fetch {
            return Err(offline());
        }
        state.fetches += 1;
        state.contents.get(path).cloned().ok_or(RemoteError::NotFound)
    }

    async fn store(&self, path: &str, content: &str, token: &str) -> Result<(), RemoteError> {
        let mut state = self.state();
        if state.fail_store {
            return Err(offline());
        }
        match state.locks.get(path) {
            Some(lock) if Self::holds(lock, token) => {
                state
                    .contents
                    .insert(path.to_string(), content.to_string());
                state.stores.push((path.to_string(), content.to_string()));
                Ok(())
            }
            _ => Err(RemoteError::WriteRejected(423)),
        }
    }

    fn resolve_url(&self, path: &str) -> String {
        format!("memory://content?path={path}")
    }
}

#[derive(Debug, Default)]
struct Recorded {
    locked: Vec<(String, LockHolder)>,
    save_prompts: Vec<String>,
    discard_prompts: Vec<String>,
    errors: Vec<String>,
}

/// Prompter with fixed answers that records what it was asked.
#[derive(Debug, Clone, Default)]
pub struct RecordingPrompter {
    save_on_close: bool,
    discard_on_refresh: bool,
    recorded: Arc<Mutex<Recorded>>,
}

impl RecordingPrompter {
    pub fn new(save_on_close: bool, discard_on_refresh: bool) -> Self {
        Self {
            save_on_close,
            discard_on_refresh,
            recorded: Arc::default(),
        }
    }

    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn locked(&self) -> Vec<(String, LockHolder)> {
        self.recorded().locked.clone()
    }

    pub fn save_prompts(&self) -> Vec<String> {
        self.recorded().save_prompts.clone()
    }

    pub fn discard_prompts(&self) -> Vec<String> {
        self.recorded().discard_prompts.clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.recorded().errors.clone()
    }
}

impl Prompter for RecordingPrompter {
    fn show_locked(&self, path: &str, holder: &LockHolder) {
        self.recorded()
            .locked
            .push((path.to_string(), holder.clone()));
    }

    fn confirm_save_on_close(&self, path: &str) -> bool {
        self.recorded().save_prompts.push(path.to_string());
        self.save_on_close
    }

    fn confirm_discard_on_refresh(&self, path: &str) -> bool {
        self.recorded().discard_prompts.push(path.to_string());
        self.discard_on_refresh
    }

    fn report_error(&self, error: &SessionError) {
        self.recorded().errors.push(error.to_string());
    }
}
