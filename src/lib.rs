//! tabdoc library
//!
//! Lock-coordinated editing of shared remote documents. Each open document is
//! a session in a tab; a tab edits a document only while it holds the
//! server-side lock for it, falls back to read-only viewing otherwise, and
//! tells its sibling tabs about every successful save so they can reload.
//!
//! # Layout
//!
//! - [`coordinator`]: open, edit, save, close and refresh, plus the
//!   reaction to bus messages and lifecycle signals.
//! - [`store`]: the per-tab set of open sessions and the active path.
//! - [`bus`]: cross-tab `file-saved` notifications over an in-process
//!   channel with a storage mailbox fallback.
//! - [`token_cache`]: lock tokens persisted per tab so a reload can recover
//!   its own locks.
//! - [`lifecycle`]: focus and teardown signals and their Unix signal source.
//! - [`tab`]: the event queue tying the pieces together for one tab.
//!
//! The HTTP lock and content service lives in the `remote-docs` crate and is
//! reached through the traits in [`remote`].
//!
//! # Platform Support
//!
//! The library itself is portable. The signal-driven [`lifecycle::LifecycleGuard`]
//! is only available on Unix-like systems.

pub mod bus;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod prompt;
pub mod remote;
pub mod session;
pub mod storage;
pub mod store;
pub mod tab;
pub mod token_cache;

#[cfg(test)]
mod test_utils;
