//! Shared helpers for the tab-local persisted state (token cache, bus mailbox).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writes `contents` to `path` atomically with temp-file-then-rename.
///
/// The temp file lives next to the target so the rename stays on one
/// filesystem. Its name carries the process id and a counter, since several
/// tabs may write the same target concurrently. Parent directories are
/// created as needed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let temp_path = path.with_file_name(format!(
        "{}.tmp.{}.{}",
        file_name,
        std::process::id(),
        seq
    ));

    fs::write(&temp_path, contents)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}

/// Maps an arbitrary identifier to a safe single file-name component.
pub fn file_component(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match cleaned.trim_matches('.') {
        "" => "_".to_string(),
        _ => cleaned,
    }
}

/// Directory holding the per-namespace lock token cache files.
pub fn token_dir(storage_dir: &Path) -> PathBuf {
    storage_dir.join("lock-tokens")
}

/// Directory of the cross-tab bus mailbox entries.
pub fn mailbox_dir(storage_dir: &Path) -> PathBuf {
    storage_dir.join("bus")
}
