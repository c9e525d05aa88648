//! The commented template written by `tabdoc config init`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::error::ConfigError;
use crate::config::xdg;

/// Starter configuration. Parses to exactly `Config::default()`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# tabdoc configuration
#
# Every value below is the built-in default; delete what you do not change.
# Location: $XDG_CONFIG_HOME/tabdoc/config.toml

# ------------------------------------------------------------------------------
# Document server
# ------------------------------------------------------------------------------

[server]

# Base URL of the lock and content service.
# Requests go to <base_url>lock, unlock, lockinfo and content.
base_url = "http://localhost:8080/api/files/"

# Header that carries the lock token when saving.
lock_token_header = "X-Lock-Token"

# Lock lifetime asked for when opening a document (sent as timeout_seconds).
# Examples: "10m", "30m", "2h"
lock_timeout = "30m"

# ------------------------------------------------------------------------------
# Identity
# ------------------------------------------------------------------------------

[user]

# User id sent when acquiring locks.
# Empty means the login name from $USER.
id = ""

# ------------------------------------------------------------------------------
# Shared storage
# ------------------------------------------------------------------------------

[storage]

# Directory shared by every tab of this user: lock token caches live in
# lock-tokens/, the cross-tab mailbox in bus/. Tabs in other terminals see
# each other's saves only through this directory.
# Empty means $XDG_STATE_HOME/tabdoc (~/.local/state/tabdoc).
# A leading ~ means the home directory.
dir = ""

# How often each tab checks the mailbox for other tabs' saves.
# Examples: "100ms", "250ms", "1s"
bus_poll_interval = "250ms"

# ------------------------------------------------------------------------------
# Confirmations
# ------------------------------------------------------------------------------

[prompts]

# Closing a document with unsaved edits saves them first.
save_on_close = true

# A plain `refresh` of a document with unsaved edits discards them.
# When false, use `refresh!` to force it.
discard_on_refresh = false

# ------------------------------------------------------------------------------
# Logging
# ------------------------------------------------------------------------------

[log]

# Logging verbosity when TABDOC_LOG is not set.
# One of "error", "warn", "info", "debug", "trace".
level = "info"
"#;

/// Writes the template to the XDG config path and returns that path.
///
/// See [`create_default_config_at`] for the `force` semantics.
pub fn create_default_config(force: bool) -> Result<PathBuf, ConfigError> {
    let path = xdg::config_path();
    create_default_config_at(&path, force)?;
    Ok(path)
}

/// Writes the template to `path`.
///
/// An existing file is an error unless `force` is set, in which case it is
/// first moved aside to `<name>.toml.backup`.
pub fn create_default_config_at(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() {
        if !force {
            return Err(ConfigError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        let backup = path.with_extension("toml.backup");
        fs::rename(path, &backup).map_err(|source| ConfigError::WriteError {
            path: backup.clone(),
            source,
        })?;
        tracing::info!(backup = %backup.display(), "previous configuration kept");
    }

    let write_err = |source| ConfigError::WriteError {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        xdg::ensure_dir(parent).map_err(write_err)?;
    }
    fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(write_err)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(write_err)?;
    }
    Ok(())
}
