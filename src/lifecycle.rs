//! Tab lifecycle signals and the guard that produces them.
//!
//! A tab learns about focus changes and teardown through
//! [`LifecycleSignal`]s. Embedders send them into the tab's event queue
//! directly; the terminal front end uses [`LifecycleGuard`], which maps Unix
//! signals:
//!
//! | Signal    | Lifecycle events                      |
//! |-----------|---------------------------------------|
//! | `SIGINT`  | `BeforeUnload`                        |
//! | `SIGTERM` | `PageHide`, then `Unload`             |
//! | `SIGCONT` | `VisibilityChanged { visible: true }` |

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::coordinator::TabEvent;

/// Focus, visibility and teardown notifications for one tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    /// The tab's window regained focus.
    FocusGained,
    /// The tab became visible or hidden.
    VisibilityChanged {
        /// `true` when the tab became visible.
        visible: bool,
    },
    /// The user asked to leave; unsaved edits may block it.
    BeforeUnload,
    /// The tab is being hidden for teardown.
    PageHide,
    /// The tab is going away.
    Unload,
}

impl LifecycleSignal {
    /// Returns `true` for the signals that end the tab.
    pub fn is_teardown(&self) -> bool {
        matches!(self, LifecycleSignal::PageHide | LifecycleSignal::Unload)
    }
}

/// Forwards process signals into a tab's event queue until dropped.
#[derive(Debug)]
pub struct LifecycleGuard {
    task: JoinHandle<()>,
}

impl LifecycleGuard {
    /// Installs the signal handlers and starts forwarding to `events`.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if a signal handler cannot be registered.
    #[cfg(unix)]
    pub fn spawn(events: mpsc::UnboundedSender<TabEvent>) -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigcont = signal(SignalKind::from_raw(sigcont_number()))?;

        let task = tokio::spawn(async move {
            loop {
                let signals: &[LifecycleSignal] = tokio::select! {
                    Some(()) = sigint.recv() => {
                        tracing::debug!("received SIGINT");
                        &[LifecycleSignal::BeforeUnload]
                    }
                    Some(()) = sigterm.recv() => {
                        tracing::info!("received SIGTERM, tearing down tab");
                        &[LifecycleSignal::PageHide, LifecycleSignal::Unload]
                    }
                    Some(()) = sigcont.recv() => {
                        tracing::debug!("received SIGCONT");
                        &[LifecycleSignal::VisibilityChanged { visible: true }]
                    }
                    else => break,
                };
                for signal in signals {
                    if events.send(TabEvent::Lifecycle(*signal)).is_err() {
                        return;
                    }
                }
            }
        });
        Ok(Self { task })
    }

    /// Stops forwarding signals.
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for LifecycleGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// `SIGCONT` number; tokio has no named `SignalKind` for it.
#[cfg(unix)]
const fn sigcont_number() -> i32 {
    if cfg!(any(target_os = "macos", target_os = "ios", target_os = "freebsd", target_os = "openbsd", target_os = "netbsd", target_os = "dragonfly")) {
        19
    } else {
        18
    }
}
