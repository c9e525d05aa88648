//! Focus, visibility and teardown handling.

use super::{Dispatch, SessionCoordinator};
use crate::lifecycle::LifecycleSignal;

impl SessionCoordinator {
    /// Refetches every session that is stale and has no local edits, one
    /// after another. Returns how many were reloaded; failures are skipped.
    pub async fn reconcile_stale(&self) -> usize {
        let mut reloaded = 0;
        for path in self.store.paths_needing_reload().await {
            if self.reload(&path).await {
                reloaded += 1;
            }
        }
        if reloaded > 0 {
            tracing::info!(reloaded, "reloaded stale sessions");
        }
        reloaded
    }

    /// Returns `true` if leaving now would lose edits.
    pub async fn has_unsaved_changes(&self) -> bool {
        self.store.has_dirty().await
    }

    /// Sends one unlock beacon per held lock and forgets the tokens.
    ///
    /// Tokens are taken out of the sessions, so a second teardown signal
    /// sends nothing. Returns the number of beacons sent.
    pub async fn release_by_beacon(&self) -> usize {
        let held = self.store.take_lock_tokens().await;
        for (path, token) in &held {
            tracing::debug!(path = %path, "sending unlock beacon");
            self.remote.send_unlock_beacon(path, token);
            self.forget_token(path);
        }
        if !held.is_empty() {
            tracing::info!(count = held.len(), "released locks by beacon");
        }
        held.len()
    }

    pub(super) async fn handle_lifecycle(&self, signal: LifecycleSignal) -> Dispatch {
        match signal {
            LifecycleSignal::FocusGained | LifecycleSignal::VisibilityChanged { visible: true } => {
                self.reconcile_stale().await;
                Dispatch::Continue
            }
            LifecycleSignal::VisibilityChanged { visible: false } => Dispatch::Continue,
            LifecycleSignal::BeforeUnload => {
                if self.has_unsaved_changes().await {
                    Dispatch::BlockUnload
                } else {
                    Dispatch::Continue
                }
            }
            LifecycleSignal::PageHide | LifecycleSignal::Unload => {
                self.release_by_beacon().await;
                Dispatch::Continue
            }
        }
    }
}
