//! Cross-tab bus for session events.
//!
//! Tabs have no server push channel, so a save in one tab reaches the others
//! peer-to-peer. Two transports are used side by side:
//!
//! - the **primary channel**, an in-process [`PrimaryHub`] shared by tabs
//!   living in the same process;
//! - the **storage mailbox**, a directory of envelope files under the shared
//!   storage directory that every subscriber polls, which reaches tabs in
//!   other processes and tabs without access to the hub.
//!
//! Delivery is best-effort and at-least-once: a tab attached to both
//! transports sees each message twice, and handlers must be idempotent. A
//! tab never receives its own messages.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

mod mailbox;
mod primary;

pub use mailbox::{Mailbox, MAILBOX_RETENTION};
pub use primary::PrimaryHub;

/// Default interval between storage mailbox polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Session event published between tabs.
///
/// Wire format: `{"type":"file-saved","path":..,"by":..,"time":..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BusMessage {
    /// A tab saved `path`.
    FileSaved {
        /// Saved document path.
        path: String,
        /// User id of the saver.
        by: String,
        /// Save time, Unix milliseconds.
        time: i64,
    },
}

impl BusMessage {
    /// Builds a `file-saved` message stamped with the current time.
    pub fn file_saved(path: impl Into<String>, by: impl Into<String>) -> Self {
        BusMessage::FileSaved {
            path: path.into(),
            by: by.into(),
            time: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Document path the message refers to.
    pub fn path(&self) -> &str {
        match self {
            BusMessage::FileSaved { path, .. } => path,
        }
    }
}

/// Transport wrapper around a [`BusMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Id of the publishing tab.
    pub origin: String,
    /// Per-tab sequence number; names the mailbox entry.
    pub seq: u64,
    /// The event itself.
    pub message: BusMessage,
}

/// One tab's handle on the cross-tab bus.
///
/// Created at tab start and shared with the coordinator; all clones publish
/// under the same origin.
#[derive(Debug, Clone)]
pub struct CrossTabBus {
    origin: String,
    primary: Option<PrimaryHub>,
    mailbox: Option<Mailbox>,
    poll_interval: Duration,
    seq: Arc<AtomicU64>,
}

impl CrossTabBus {
    /// Creates a bus handle for the tab `origin`.
    ///
    /// Either transport may be absent; with neither, publishing is a no-op.
    pub fn new(
        origin: impl Into<String>,
        primary: Option<PrimaryHub>,
        mailbox: Option<Mailbox>,
    ) -> Self {
        Self {
            origin: origin.into(),
            primary,
            mailbox,
            poll_interval: DEFAULT_POLL_INTERVAL,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Sets how often subscribers poll the storage mailbox.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Id of the tab this handle publishes as.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Publishes `message` to every other tab. Fire-and-forget.
    pub fn publish(&self, message: BusMessage) {
        let envelope = Envelope {
            origin: self.origin.clone(),
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            message,
        };
        tracing::debug!(
            path = envelope.message.path(),
            seq = envelope.seq,
            "publishing bus message"
        );

        if let Some(primary) = &self.primary {
            primary.send(envelope.clone());
        }
        if let Some(mailbox) = &self.mailbox {
            let mailbox = mailbox.clone();
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn_blocking(move || mirror(&mailbox, &envelope));
                }
                Err(_) => mirror(&mailbox, &envelope),
            }
        }
    }

    /// Delivers every foreign message from either transport to `handler`.
    ///
    /// The listener runs as a spawned task until the returned
    /// [`Subscription`] is dropped or unsubscribed. Must be called within a
    /// Tokio runtime.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(BusMessage) + Send + Sync + 'static,
    {
        let origin = self.origin.clone();
        let mut primary_rx = self.primary.as_ref().map(PrimaryHub::subscribe);
        let mut watcher = self.mailbox.clone().map(|m| m.watch());
        let poll_interval = self.poll_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    received = recv_primary(&mut primary_rx) => {
                        match received {
                            Some(envelope) if envelope.origin != origin => handler(envelope.message),
                            Some(_) => {}
                            None => primary_rx = None,
                        }
                    }
                    _ = ticker.tick(), if watcher.is_some() => {
                        let Some(watcher) = watcher.as_mut() else { continue };
                        for envelope in watcher.poll().await {
                            if envelope.origin != origin {
                                handler(envelope.message);
                            }
                        }
                    }
                }
            }
        });
        Subscription { task: Some(task) }
    }
}

fn mirror(mailbox: &Mailbox, envelope: &Envelope) {
    if let Err(e) = mailbox.post(envelope) {
        tracing::warn!(error = %e, "failed to mirror bus message to storage");
    }
}

/// Next envelope from the primary channel; pends forever when there is none.
///
/// Returns `None` once the hub is gone. Lagged receivers skip the lost
/// messages and keep listening.
async fn recv_primary(
    rx: &mut Option<tokio::sync::broadcast::Receiver<Envelope>>,
) -> Option<Envelope> {
    use tokio::sync::broadcast::error::RecvError;

    let Some(receiver) = rx.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        match receiver.recv().await {
            Ok(envelope) => return Some(envelope),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "bus subscriber lagged, messages dropped");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

/// Active bus subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stops delivery.
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    /// Returns `true` while the listener task is running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}
