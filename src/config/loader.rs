//! Locating and parsing the configuration file.
//!
//! The file is looked up in order: an explicit `--config` path, the
//! `TABDOC_CONFIG` environment variable, then the XDG location. Only the XDG
//! location may be missing; built-in defaults apply then.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::error::ConfigError;
use crate::config::schema::Config;
use crate::config::xdg;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV_VAR: &str = "TABDOC_CONFIG";

/// Where the configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named on the command line or in `TABDOC_CONFIG`; must exist.
    Explicit(PathBuf),
    /// The XDG location; may be absent.
    Default(PathBuf),
}

impl ConfigSource {
    /// Resolves the source for an optional `--config` argument.
    pub fn resolve(explicit: Option<&Path>) -> Self {
        if let Some(path) = explicit {
            return ConfigSource::Explicit(path.to_path_buf());
        }
        match std::env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
            Some(path) => ConfigSource::Explicit(PathBuf::from(path)),
            None => ConfigSource::Default(xdg::config_path()),
        }
    }

    /// File path of this source.
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::Explicit(path) | ConfigSource::Default(path) => path,
        }
    }
}

/// Stateless configuration loader.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the configuration for an optional `--config` argument.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        Self::load_source(&ConfigSource::resolve(explicit))
    }

    /// Loads from `source`. A missing default file yields `Config::default()`.
    pub fn load_source(source: &ConfigSource) -> Result<Config, ConfigError> {
        match (source, Self::read(source.path())) {
            (ConfigSource::Default(path), Err(ConfigError::NotFound { .. })) => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Config::default())
            }
            (_, Ok(content)) => Self::parse_toml(&content, source.path()),
            (_, Err(e)) => Err(e),
        }
    }

    /// Loads `path`, which must exist.
    pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
        Self::load_source(&ConfigSource::Explicit(path.to_path_buf()))
    }

    fn read(path: &Path) -> Result<String, ConfigError> {
        fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ConfigError::NotFound {
                path: path.to_path_buf(),
            },
            _ => ConfigError::ReadError {
                path: path.to_path_buf(),
                source,
            },
        })
    }

    /// Parses TOML, reporting failures with a one-based line and column.
    fn parse_toml(content: &str, path: &Path) -> Result<Config, ConfigError> {
        toml::from_str(content).map_err(|e| {
            let (line, column) = e
                .span()
                .map(|span| line_column(content, span.start))
                .unwrap_or((0, 0));
            ConfigError::ParseError {
                path: path.to_path_buf(),
                line,
                column,
                message: e.message().to_string(),
            }
        })
    }
}

/// One-based line and column of byte `offset` in `text`.
fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset.min(text.len())];
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    (before.matches('\n').count() + 1, before.len() - line_start + 1)
}
