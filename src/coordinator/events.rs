//! Tagged events consumed by [`SessionCoordinator::dispatch`].
//!
//! Bus deliveries and lifecycle signals arrive asynchronously from listeners
//! that must not touch the store themselves. They are queued as
//! [`TabEvent`]s and applied one at a time by the coordinator.
//!
//! [`SessionCoordinator::dispatch`]: super::SessionCoordinator::dispatch

use crate::bus::BusMessage;
use crate::lifecycle::LifecycleSignal;

/// Event queued for the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEvent {
    /// A message from another tab.
    Bus(BusMessage),
    /// A window/tab lifecycle signal.
    Lifecycle(LifecycleSignal),
}

impl From<BusMessage> for TabEvent {
    fn from(msg: BusMessage) -> Self {
        TabEvent::Bus(msg)
    }
}

impl From<LifecycleSignal> for TabEvent {
    fn from(signal: LifecycleSignal) -> Self {
        TabEvent::Lifecycle(signal)
    }
}

/// What the host should do after an event was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Nothing further.
    Continue,
    /// Unsaved edits exist; ask before navigating away.
    BlockUnload,
}

/// Which unlock mechanism a close ended up using.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockPath {
    /// The session held no lock (read-only, or the token was already gone).
    NotHeld,
    /// `release` succeeded.
    Released,
    /// The server no longer knew the token; treated as released.
    AlreadyReleased,
    /// `release` failed and an unlock beacon was sent instead.
    Beacon,
}

/// What happened to unsaved edits during close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOnClose {
    /// The session had nothing to save.
    NotNeeded,
    /// The user chose not to save.
    Declined,
    /// Saved successfully.
    Saved,
    /// Saving was attempted and failed; the edits were dropped.
    Failed,
}

/// Summary of a completed close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReport {
    /// Closed path.
    pub path: String,
    /// Fate of unsaved edits.
    pub save: SaveOnClose,
    /// Unlock mechanism used.
    pub unlock: UnlockPath,
}

/// Result of a save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Content written and `file-saved` published.
    Saved,
    /// The session was not editable and dirty; nothing was sent.
    NotDirty,
    /// No active session.
    NoActiveSession,
}
