//! Where tabdoc keeps its files.
//!
//! | Kind   | Override           | Linux default          | macOS default                               |
//! |--------|--------------------|------------------------|---------------------------------------------|
//! | config | `$XDG_CONFIG_HOME` | `~/.config`            | `~/Library/Application Support`             |
//! | state  | `$XDG_STATE_HOME`  | `~/.local/state`       | `~/Library/Application Support/tabdoc/state` |
//!
//! Every tab of a user shares the state directory: lock token caches and the
//! cross-tab mailbox live there.

use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "tabdoc";

/// `tabdoc` below `$var`, or `fallback()` when the variable is unset or empty.
fn app_dir(var: &str, fallback: impl FnOnce() -> PathBuf) -> PathBuf {
    match std::env::var_os(var).filter(|v| !v.is_empty()) {
        Some(base) => PathBuf::from(base).join(APP_NAME),
        None => fallback(),
    }
}

/// Configuration directory.
pub fn config_dir() -> PathBuf {
    app_dir("XDG_CONFIG_HOME", || native_config_base().join(APP_NAME))
}

/// Default configuration file, `config.toml` in [`config_dir`].
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Shared state directory for token caches and the bus mailbox.
pub fn state_dir() -> PathBuf {
    app_dir("XDG_STATE_HOME", native_state_dir)
}

#[cfg(target_os = "macos")]
fn native_config_base() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| home().join("Library/Application Support"))
}

#[cfg(not(target_os = "macos"))]
fn native_config_base() -> PathBuf {
    home().join(".config")
}

#[cfg(target_os = "macos")]
fn native_state_dir() -> PathBuf {
    native_config_base().join(APP_NAME).join("state")
}

#[cfg(not(target_os = "macos"))]
fn native_state_dir() -> PathBuf {
    home().join(".local/state").join(APP_NAME)
}

/// Replaces a leading `~` or `~/` with the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some("") => home(),
        Some(rest) if rest.starts_with('/') => home().join(&rest[1..]),
        _ => PathBuf::from(path),
    }
}

/// Creates `path` and its parents, owner-only (0700) on Unix.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}
