//! User-facing dialogs raised by the coordinator.
//!
//! The coordinator never renders anything itself. Informational dialogs,
//! confirmations and error reports go through a [`Prompter`], which the
//! embedding UI implements.

use crate::error::SessionError;
use crate::config::schema::PromptsConfig;

/// Who holds the lock that forced a read-only open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockHolder {
    /// The same user, in another tab or process.
    SelfElsewhere,
    /// A different user.
    Other(String),
    /// Locked, but the server did not say by whom.
    Unknown,
}

impl LockHolder {
    /// Classifies the reported `owner` relative to the caller.
    pub fn classify(owner: Option<&str>, caller: &str) -> Self {
        match owner {
            Some(o) if o == caller => LockHolder::SelfElsewhere,
            Some(o) => LockHolder::Other(o.to_string()),
            None => LockHolder::Unknown,
        }
    }
}

/// Dialog surface used by the coordinator.
pub trait Prompter: Send + Sync {
    /// Tells the user `path` was opened read-only because of `holder`.
    fn show_locked(&self, path: &str, holder: &LockHolder);

    /// Asks whether to save unsaved edits before closing `path`.
    fn confirm_save_on_close(&self, path: &str) -> bool;

    /// Asks whether to discard unsaved edits and reload `path`.
    fn confirm_discard_on_refresh(&self, path: &str) -> bool;

    /// Surfaces a failure of a user-initiated operation.
    fn report_error(&self, error: &SessionError);
}

/// Prompter for the terminal: messages go to stderr and confirmations are
/// answered from configuration.
#[derive(Debug, Clone)]
pub struct ConsolePrompter {
    save_on_close: bool,
    discard_on_refresh: bool,
}

impl ConsolePrompter {
    /// Builds a prompter answering confirmations from `[prompts]`.
    pub fn new(config: &PromptsConfig) -> Self {
        Self {
            save_on_close: config.save_on_close,
            discard_on_refresh: config.discard_on_refresh,
        }
    }
}

impl Prompter for ConsolePrompter {
    fn show_locked(&self, path: &str, holder: &LockHolder) {
        match holder {
            LockHolder::SelfElsewhere => {
                eprintln!("{path} is locked by you in another tab; opened read-only.")
            }
            LockHolder::Other(owner) => {
                eprintln!("{path} is locked by {owner}; opened read-only.")
            }
            LockHolder::Unknown => eprintln!("{path} is locked; opened read-only."),
        }
    }

    fn confirm_save_on_close(&self, path: &str) -> bool {
        let verb = if self.save_on_close { "saving" } else { "discarding" };
        eprintln!("{path} has unsaved changes; {verb} before close.");
        self.save_on_close
    }

    fn confirm_discard_on_refresh(&self, path: &str) -> bool {
        if !self.discard_on_refresh {
            eprintln!("{path} has unsaved changes; refresh skipped (use `refresh! {path}` to discard).");
        }
        self.discard_on_refresh
    }

    fn report_error(&self, error: &SessionError) {
        eprintln!("error: {error}");
    }
}
