//! TOML configuration schema types for tabdoc.
//!
//! All structs derive `Deserialize` and `Serialize` with defaults via
//! `#[serde(default)]`, so a partial file (or none at all) is valid.
//!
//! Duration fields use human-readable strings (e.g. `"250ms"`, `"1s"`)
//! parsed by the `humantime` crate.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::config::xdg;

/// Root configuration.
///
/// ```toml
/// [server]
/// [user]
/// [storage]
/// [prompts]
/// [log]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Lock and content service endpoint.
    pub server: ServerConfig,
    /// Identity locks are requested for.
    pub user: UserConfig,
    /// Token cache and bus mailbox location.
    pub storage: StorageConfig,
    /// Answers to confirmation dialogs in the terminal front end.
    pub prompts: PromptsConfig,
    /// Logging.
    pub log: LogConfig,
}

impl Config {
    /// Checks values that parse as TOML but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.server.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "server.base_url",
                message: format!("expected an http(s) URL, got {base:?}"),
            });
        }
        self.server.lock_timeout()?;
        if self.server.lock_token_header.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "server.lock_token_header",
                message: "must not be empty".to_string(),
            });
        }
        self.storage.poll_interval()?;
        Ok(())
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL; `lock`, `unlock`, `lockinfo` and `content` are resolved
    /// against it.
    pub base_url: String,
    /// Header carrying the lock token on content writes.
    pub lock_token_header: String,
    /// Lock lifetime requested from the server, e.g. `"30m"`.
    pub lock_timeout: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/files/".to_string(),
            lock_token_header: remote_docs::DEFAULT_LOCK_TOKEN_HEADER.to_string(),
            lock_timeout: "30m".to_string(),
        }
    }
}

impl ServerConfig {
    /// Parsed `lock_timeout`; at least one second.
    pub fn lock_timeout(&self) -> Result<Duration, ConfigError> {
        let timeout = humantime::parse_duration(&self.lock_timeout).map_err(|e| {
            ConfigError::InvalidValue {
                key: "server.lock_timeout",
                message: e.to_string(),
            }
        })?;
        if timeout < Duration::from_secs(1) {
            return Err(ConfigError::InvalidValue {
                key: "server.lock_timeout",
                message: "must be at least one second".to_string(),
            });
        }
        Ok(timeout)
    }
}

/// `[user]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UserConfig {
    /// User id. Empty means `$USER`.
    pub id: String,
}

impl UserConfig {
    /// Configured id, else `$USER`/`$USERNAME`, else `anonymous`.
    pub fn resolve(&self) -> String {
        if !self.id.trim().is_empty() {
            return self.id.trim().to_string();
        }
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| "anonymous".to_string())
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory shared by all tabs of this user. Empty means the platform
    /// state directory.
    pub dir: String,
    /// How often tabs poll the storage mailbox.
    pub bus_poll_interval: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: String::new(),
            bus_poll_interval: "250ms".to_string(),
        }
    }
}

impl StorageConfig {
    /// Storage directory with `~` expanded.
    pub fn resolve_dir(&self) -> PathBuf {
        if self.dir.trim().is_empty() {
            xdg::state_dir()
        } else {
            xdg::expand_tilde(self.dir.trim())
        }
    }

    /// Parsed `bus_poll_interval`.
    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        let interval = humantime::parse_duration(&self.bus_poll_interval).map_err(|e| {
            ConfigError::InvalidValue {
                key: "storage.bus_poll_interval",
                message: e.to_string(),
            }
        })?;
        if interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "storage.bus_poll_interval",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(interval)
    }
}

/// `[prompts]` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PromptsConfig {
    /// Save unsaved edits when closing a document.
    pub save_on_close: bool,
    /// Drop unsaved edits on a plain `refresh`.
    pub discard_on_refresh: bool,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            save_on_close: true,
            discard_on_refresh: false,
        }
    }
}

/// `[log]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Verbosity when `TABDOC_LOG` is unset.
    pub level: LogLevel,
}

/// Log verbosity levels (kebab-case in TOML).
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    /// Only errors.
    Error,
    /// Errors and warnings.
    Warn,
    /// Informational messages.
    #[default]
    Info,
    /// Debug-level detail.
    Debug,
    /// Full trace output.
    Trace,
}

impl LogLevel {
    /// Filter directive for this level.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
