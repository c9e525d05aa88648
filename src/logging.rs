//! Logging initialization for tabdoc.
//!
//! Configures the `tracing` subscriber with level filtering via the
//! `TABDOC_LOG` environment variable. When the variable is unset or invalid
//! the `[log] level` from the configuration file applies.
//!
//! # Usage
//!
//! ```bash
//! # Configured level (info unless changed)
//! tabdoc tab
//!
//! # Debug level
//! TABDOC_LOG=debug tabdoc tab
//!
//! # Module-specific filtering
//! TABDOC_LOG=tabdoc::bus=trace,info tabdoc tab
//! ```

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::schema::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV_VAR: &str = "TABDOC_LOG";

/// Builds the filter: `TABDOC_LOG` if it parses, else `fallback`.
pub fn filter(fallback: LogLevel) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(fallback.as_directive()))
}

/// Initialize the tracing subscriber.
///
/// Output goes to stderr so it never interleaves with command output on
/// stdout. A second call is a no-op.
pub fn init(fallback: LogLevel) {
    let _ = fmt()
        .with_env_filter(filter(fallback))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
