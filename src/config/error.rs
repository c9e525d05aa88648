//! Errors from reading, parsing, validating and writing the config file.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration failure.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Failed to read configuration file: {path}")]
    ReadError {
        /// File path.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for the schema.
    #[error("Invalid configuration at {path}:{line}:{column}: {message}")]
    ParseError {
        /// File path.
        path: PathBuf,
        /// One-based line, 0 when unknown.
        line: usize,
        /// One-based column, 0 when unknown.
        column: usize,
        /// Parser message.
        message: String,
    },

    /// A file named explicitly does not exist.
    #[error("Configuration file not found: {path}")]
    NotFound {
        /// File path.
        path: PathBuf,
    },

    /// `config init` without `--force` found an existing file.
    #[error("Configuration file already exists: {path} (use --force to replace it)")]
    AlreadyExists {
        /// File path.
        path: PathBuf,
    },

    /// Writing the file or its backup failed.
    #[error("Failed to write configuration file: {path}")]
    WriteError {
        /// File path.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value parsed but is not usable.
    #[error("Invalid value for `{key}`: {message}")]
    InvalidValue {
        /// Dotted key, e.g. `storage.bus_poll_interval`.
        key: &'static str,
        /// What is wrong with it.
        message: String,
    },
}
