//! Tests for the SessionCoordinator.
//!
//! Tests are organized into categories:
//! - `open`: open protocol, stray-lock reconciliation, mutual exclusion
//! - `save`: save protocol and write rejection
//! - `close`: close protocol, unlock fallback, token cache cleanup
//! - `sync`: cross-tab `file-saved` handling, refresh, stale reconciliation
//! - `lifecycle`: before-unload and teardown signals

mod open;

use std::sync::Arc;

use super::SessionCoordinator;
use crate::bus::CrossTabBus;
use crate::test_utils::{MemoryService, RecordingPrompter};
use crate::token_cache::TokenCache;

pub(super) const ALICE: &str = "alice";
pub(super) const BOB: &str = "bob";

/// A coordinator plus handles on its collaborators.
pub(super) struct Fixture {
    pub coordinator: SessionCoordinator,
    pub service: MemoryService,
    pub prompter: RecordingPrompter,
    pub tokens: Arc<TokenCache>,
}

/// Builds a coordinator for `owner` against `service` with no bus
/// transports, an in-memory token cache, and a prompter that saves on close
/// and keeps edits on refresh.
pub(super) fn tab(service: &MemoryService, owner: &str) -> Fixture {
    tab_with(
        service,
        owner,
        RecordingPrompter::new(true, false),
        CrossTabBus::new(format!("tab-{owner}"), None, None),
        Arc::new(TokenCache::in_memory()),
    )
}

pub(super) fn tab_with(
    service: &MemoryService,
    owner: &str,
    prompter: RecordingPrompter,
    bus: CrossTabBus,
    tokens: Arc<TokenCache>,
) -> Fixture {
    let coordinator = SessionCoordinator::new(
        owner,
        Arc::new(service.clone()),
        bus,
        Arc::clone(&tokens),
        Arc::new(prompter.clone()),
    );
    Fixture {
        coordinator,
        service: service.clone(),
        prompter,
        tokens,
    }
}

/// A service with two documents.
pub(super) fn service() -> MemoryService {
    MemoryService::new()
        .with_document("/doc1.xml", "<doc1/>")
        .with_document("/doc2.json", "{}")
}
