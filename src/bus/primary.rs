//! In-process primary channel shared by tabs of one process.

use tokio::sync::broadcast;

use super::Envelope;

const DEFAULT_HUB_CAPACITY: usize = 256;

/// Broadcast hub connecting every tab in the same process.
///
/// Clones share one channel. Sending with no receivers is not an error.
#[derive(Debug, Clone)]
pub struct PrimaryHub {
    tx: broadcast::Sender<Envelope>,
}

impl PrimaryHub {
    /// Creates a hub with the default capacity.
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_HUB_CAPACITY);
        Self { tx }
    }

    pub(super) fn send(&self, envelope: Envelope) {
        match self.tx.send(envelope) {
            Ok(count) => tracing::trace!("bus message sent to {} listeners", count),
            Err(_) => tracing::trace!("no listeners on primary bus channel"),
        }
    }

    pub(super) fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    /// Number of listeners attached to the hub.
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for PrimaryHub {
    fn default() -> Self {
        Self::new()
    }
}
