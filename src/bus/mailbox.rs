//! Persisted-storage fallback transport.
//!
//! The mailbox is a directory of envelope files, one per published message,
//! named `<instance>-<origin>-<seq>.json`. Publishing adds a file atomically
//! and prunes files older than [`MAILBOX_RETENTION`]. Each subscriber lists
//! the directory on every poll and delivers every file it has not seen yet,
//! so back-to-back publishes are never collapsed.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::Envelope;
use crate::storage;

/// How long a posted envelope stays in the mailbox.
///
/// Subscribers poll far more often than this; anything older has been seen
/// by every live tab.
pub const MAILBOX_RETENTION: Duration = Duration::from_secs(60);

const ENTRY_SUFFIX: &str = ".json";

/// Shared mailbox directory.
///
/// Each handle stamps its entries with the time it was created, so a tab
/// restarted under the same id never reuses an earlier run's file names.
#[derive(Debug, Clone)]
pub struct Mailbox {
    dir: PathBuf,
    instance: i64,
}

impl Mailbox {
    /// Mailbox under the shared storage directory.
    pub fn in_storage(storage_dir: &Path) -> Self {
        Self::at(storage::mailbox_dir(storage_dir))
    }

    /// Mailbox at an explicit directory.
    pub fn at(dir: PathBuf) -> Self {
        Self {
            dir,
            instance: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Mailbox directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Adds `envelope` to the mailbox and prunes expired entries.
    ///
    /// Blocking; async callers go through `spawn_blocking`.
    pub fn post(&self, envelope: &Envelope) -> io::Result<PathBuf> {
        let json = serde_json::to_vec(envelope).map_err(io::Error::other)?;
        let entry = self.dir.join(self.entry_name(envelope));
        storage::write_atomic(&entry, &json)?;
        self.prune(MAILBOX_RETENTION);
        Ok(entry)
    }

    fn entry_name(&self, envelope: &Envelope) -> String {
        format!(
            "{:013}-{}-{:010}{ENTRY_SUFFIX}",
            self.instance,
            storage::file_component(&envelope.origin),
            envelope.seq
        )
    }

    /// Removes entries last modified more than `retention` ago.
    fn prune(&self, retention: Duration) {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        let now = SystemTime::now();
        for entry in entries.filter_map(Result::ok) {
            let expired = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age > retention);
            if expired && is_entry_name(&entry.file_name().to_string_lossy()) {
                if let Err(e) = fs::remove_file(entry.path()) {
                    tracing::debug!(error = %e, "failed to prune bus mailbox entry");
                }
            }
        }
    }

    /// Starts watching from the current content; entries already in the
    /// mailbox are never delivered.
    pub fn watch(self) -> MailboxWatcher {
        let seen: HashSet<String> = fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .filter(|name| is_entry_name(name))
                    .collect()
            })
            .unwrap_or_default();
        MailboxWatcher { dir: self.dir, seen }
    }
}

fn is_entry_name(name: &str) -> bool {
    name.ends_with(ENTRY_SUFFIX) && !name.starts_with('.')
}

/// Change detector over a [`Mailbox`].
#[derive(Debug)]
pub struct MailboxWatcher {
    dir: PathBuf,
    seen: HashSet<String>,
}

impl MailboxWatcher {
    /// Returns every envelope posted since the last poll, oldest publisher
    /// first and in sequence order per publisher.
    ///
    /// Unreadable or malformed entries are skipped (and remembered, so they
    /// are not reported again).
    pub async fn poll(&mut self) -> Vec<Envelope> {
        let mut names = match list_entries(&self.dir).await {
            Ok(names) => names,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::debug!(error = %e, "failed to list bus mailbox");
                }
                return Vec::new();
            }
        };
        names.sort();

        let mut fresh = Vec::new();
        for name in names.iter().filter(|n| !self.seen.contains(*n)) {
            let raw = match tokio::fs::read_to_string(self.dir.join(name)).await {
                Ok(raw) => raw,
                Err(_) => continue,
            };
            match serde_json::from_str(&raw) {
                Ok(envelope) => fresh.push(envelope),
                Err(e) => {
                    tracing::debug!(entry = %name, error = %e, "ignoring malformed bus mailbox entry");
                }
            }
        }
        // Pruned entries drop out of `seen` here.
        self.seen = names.into_iter().collect();
        fresh
    }
}

async fn list_entries(dir: &Path) -> io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_entry_name(&name) {
            names.push(name);
        }
    }
    Ok(names)
}
