//! Open protocol.

use std::sync::Arc;

use remote_docs::BINARY_CONTENT_PLACEHOLDER;

use super::{service, tab, tab_with, ALICE, BOB};
use crate::bus::CrossTabBus;
use crate::coordinator::{normalize_token, SaveOutcome};
use crate::error::{CacheError, SessionError};
use crate::prompt::LockHolder;
use crate::session::SessionState;
use crate::test_utils::RecordingPrompter;
use crate::token_cache::TokenCache;

#[tokio::test]
async fn test_open_unlocked_is_editable() {
    let f = tab(&service(), ALICE);
    let state = f.coordinator.open_file_path("/doc1.xml").await.expect("open");
    assert_eq!(state, SessionState::EditableClean);

    let session = f.coordinator.store().get("/doc1.xml").await.expect("open");
    assert_eq!(session.content, "<doc1/>");
    assert_eq!(session.display_name, "doc1.xml");
    assert_eq!(session.resolved_url, "memory://content?path=/doc1.xml");
    assert_eq!(session.lock_token.as_deref(), Some("opaquelocktoken:1"));
    assert_eq!(session.lock_timeout.and_then(|t| t.as_secs()), Some(600));
    assert_eq!(f.service.lock_owner("/doc1.xml").as_deref(), Some(ALICE));
}

#[tokio::test]
async fn test_open_caches_normalized_token() {
    let f = tab(&service(), ALICE);
    f.coordinator.open_file_path("/doc1.xml").await.expect("open");
    assert_eq!(f.tokens.get("/doc1.xml").as_deref(), Some("opaquelocktoken:1"));
}

#[tokio::test]
async fn test_open_makes_session_active() {
    let f = tab(&service(), ALICE);
    f.coordinator.open_file_path("/doc1.xml").await.expect("open");
    f.coordinator.open_file_path("/doc2.json").await.expect("open");
    assert_eq!(
        f.coordinator.store().active_path().await.as_deref(),
        Some("/doc2.json")
    );
}

#[tokio::test]
async fn test_open_locked_by_other_is_read_only() {
    let service = service();
    service.lock_as("/doc1.xml", BOB);
    let f = tab(&service, ALICE);

    let state = f.coordinator.open_file_path("/doc1.xml").await.expect("open");
    assert_eq!(state, SessionState::ReadOnly);

    let session = f.coordinator.store().get("/doc1.xml").await.expect("open");
    assert!(session.lock_token.is_none());
    assert_eq!(session.content, "<doc1/>");
    assert_eq!(
        f.prompter.locked(),
        vec![("/doc1.xml".to_string(), LockHolder::Other(BOB.to_string()))]
    );
    assert!(f.service.acquires().is_empty());
}

#[tokio::test]
async fn test_open_locked_by_self_elsewhere_is_read_only() {
    let service = service();
    let first = tab(&service, ALICE);
    let second = tab(&service, ALICE);

    first.coordinator.open_file_path("/doc1.xml").await.expect("open");
    let state = second.coordinator.open_file_path("/doc1.xml").await.expect("open");

    assert_eq!(state, SessionState::ReadOnly);
    assert_eq!(
        second.prompter.locked(),
        vec![("/doc1.xml".to_string(), LockHolder::SelfElsewhere)]
    );
    // The first tab keeps its lock.
    assert!(first.coordinator.store().get("/doc1.xml").await.expect("open").holds_lock());
}

#[tokio::test]
async fn test_second_open_across_tabs_never_yields_two_editors() {
    let service = service();
    let tabs = [tab(&service, ALICE), tab(&service, BOB), tab(&service, ALICE)];

    let mut editable = 0;
    for f in &tabs {
        if f.coordinator.open_file_path("/doc1.xml").await.expect("open")
            == SessionState::EditableClean
        {
            editable += 1;
        }
    }
    assert_eq!(editable, 1);
}

#[tokio::test]
async fn test_read_only_open_drops_foreign_cached_token() {
    let service = service();
    service.lock_as("/doc1.xml", BOB);
    let f = tab(&service, ALICE);
    f.tokens.put("/doc1.xml", "old-token").expect("cache");

    f.coordinator.open_file_path("/doc1.xml").await.expect("open");
    assert!(f.tokens.get("/doc1.xml").is_none());
}

#[tokio::test]
async fn test_stray_own_lock_is_released_and_reacquired() {
    let service = service();
    let raw = service.lock_as("/doc1.xml", ALICE);
    let f = tab(&service, ALICE);
    f.tokens
        .put("/doc1.xml", &normalize_token(&raw))
        .expect("cache");

    let state = f.coordinator.open_file_path("/doc1.xml").await.expect("open");

    assert_eq!(state, SessionState::EditableClean);
    assert_eq!(f.service.releases().len(), 1);
    assert!(f.prompter.locked().is_empty());
    let fresh = f.tokens.get("/doc1.xml").expect("fresh token cached");
    assert_ne!(fresh, normalize_token(&raw));
}

#[tokio::test]
async fn test_cached_token_of_other_tab_is_not_trusted() {
    let service = service();
    service.lock_as("/doc1.xml", ALICE);
    let f = tab(&service, ALICE);
    f.tokens.put("/doc1.xml", "opaquelocktoken:999").expect("cache");

    let state = f.coordinator.open_file_path("/doc1.xml").await.expect("open");

    assert_eq!(state, SessionState::ReadOnly);
    assert!(f.service.releases().is_empty());
    assert!(f.tokens.get("/doc1.xml").is_none());
}

#[tokio::test]
async fn test_open_already_open_path_only_activates() {
    let f = tab(&service(), ALICE);
    f.coordinator.open_file_path("/doc1.xml").await.expect("open");
    f.coordinator.open_file_path("/doc2.json").await.expect("open");
    let fetches = f.service.fetch_count();

    let state = f.coordinator.open_file_path("/doc1.xml").await.expect("reopen");

    assert_eq!(state, SessionState::EditableClean);
    assert_eq!(f.service.fetch_count(), fetches);
    assert_eq!(f.service.acquires().len(), 2);
    assert_eq!(f.coordinator.store().len().await, 2);
    assert_eq!(
        f.coordinator.store().active_path().await.as_deref(),
        Some("/doc1.xml")
    );
}

#[tokio::test]
async fn test_lost_acquire_race_opens_nothing() {
    let service = service();
    service.steal_next_acquire(BOB);
    let f = tab(&service, ALICE);

    let err = f
        .coordinator
        .open_file_path("/doc1.xml")
        .await
        .expect_err("race lost");

    match err {
        SessionError::LockUnavailable { path, owner } => {
            assert_eq!(path, "/doc1.xml");
            assert_eq!(owner.as_deref(), Some(BOB));
        }
        other => panic!("expected LockUnavailable, got {other:?}"),
    }
    assert!(f.coordinator.store().is_empty().await);
    assert!(f.tokens.get("/doc1.xml").is_none());
    assert_eq!(f.prompter.errors().len(), 1);
}

#[tokio::test]
async fn test_query_failure_is_surfaced() {
    let service = service();
    service.fail_query(true);
    let f = tab(&service, ALICE);

    let err = f.coordinator.open_file_path("/doc1.xml").await.expect_err("offline");
    assert!(matches!(err, SessionError::Transport(_)));
    assert!(f.coordinator.store().is_empty().await);
    assert_eq!(f.prompter.errors().len(), 1);
}

#[tokio::test]
async fn test_fetch_failure_after_acquire_releases_lock() {
    let service = service();
    service.fail_fetch(true);
    let f = tab(&service, ALICE);

    f.coordinator.open_file_path("/doc1.xml").await.expect_err("fetch fails");

    assert!(!f.service.is_locked("/doc1.xml"));
    assert!(f.tokens.get("/doc1.xml").is_none());
    assert!(f.coordinator.store().is_empty().await);
}

#[tokio::test]
async fn test_missing_document_is_surfaced() {
    let f = tab(&service(), ALICE);
    let err = f.coordinator.open_file_path("/missing.txt").await.expect_err("404");
    assert!(matches!(
        err,
        SessionError::Transport(remote_docs::RemoteError::NotFound)
    ));
    assert!(!f.service.is_locked("/missing.txt"));
}

#[tokio::test]
async fn test_edit_read_only_is_rejected() {
    let service = service();
    service.lock_as("/doc1.xml", BOB);
    let f = tab(&service, ALICE);
    f.coordinator.open_file_path("/doc1.xml").await.expect("open");

    let accepted = f.coordinator.edit("/doc1.xml", "<mine/>").await.expect("open");

    assert!(!accepted);
    let session = f.coordinator.store().get("/doc1.xml").await.expect("open");
    assert_eq!(session.content, "<doc1/>");
    assert!(!session.flags.dirty);
}

#[tokio::test]
async fn test_edit_editable_marks_dirty() {
    let f = tab(&service(), ALICE);
    f.coordinator.open_file_path("/doc1.xml").await.expect("open");

    assert!(f.coordinator.edit("/doc1.xml", "<mine/>").await.expect("open"));
    let session = f.coordinator.store().get("/doc1.xml").await.expect("open");
    assert_eq!(session.state(), SessionState::EditableDirty);
}

#[tokio::test]
async fn test_edit_unknown_path_is_not_open() {
    let f = tab(&service(), ALICE);
    let err = f.coordinator.edit("/nope", "x").await.expect_err("not open");
    assert!(matches!(err, SessionError::NotOpen(p) if p == "/nope"));
}

#[tokio::test]
async fn test_lock_info_passes_query_through() {
    let service = service();
    service.lock_as("/doc1.xml", BOB);
    let f = tab(&service, ALICE);

    let info = f.coordinator.lock_info("/doc1.xml").await.expect("query");
    assert!(info.locked);
    assert_eq!(info.owner.as_deref(), Some(BOB));
    assert!(!f.coordinator.lock_info("/doc2.json").await.expect("query").locked);
}

#[tokio::test]
async fn test_activate_unknown_path_fails() {
    let f = tab(&service(), ALICE);
    let err = f.coordinator.activate("/nope").await.expect_err("not open");
    assert!(matches!(err, SessionError::Store(_)));
}

#[tokio::test]
async fn test_live_tab_id_cannot_steal_its_own_lock() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = service();
    let first = tab_with(
        &service,
        ALICE,
        RecordingPrompter::new(true, false),
        CrossTabBus::new("work", None, None),
        Arc::new(TokenCache::open(dir.path(), "work").expect("open cache")),
    );
    let state = first.coordinator.open_file_path("/doc1.xml").await.expect("open");
    assert_eq!(state, SessionState::EditableClean);

    let err = TokenCache::open(dir.path(), "work").expect_err("tab id is live");
    assert!(matches!(err, CacheError::InUse { .. }));

    let (other_id, other_cache) = TokenCache::open_free(dir.path(), "work").expect("free id");
    let second = tab_with(
        &service,
        ALICE,
        RecordingPrompter::new(true, false),
        CrossTabBus::new(other_id, None, None),
        Arc::new(other_cache),
    );
    let state = second.coordinator.open_file_path("/doc1.xml").await.expect("open");
    assert_eq!(state, SessionState::ReadOnly);
    assert_eq!(
        second.prompter.locked(),
        vec![("/doc1.xml".to_string(), LockHolder::SelfElsewhere)]
    );
    assert!(service.releases().is_empty());

    first.coordinator.edit("/doc1.xml", "<mine/>").await.expect("edit");
    let outcome = first.coordinator.save("/doc1.xml").await.expect("save");
    assert_eq!(outcome, SaveOutcome::Saved);
    assert_eq!(service.content("/doc1.xml").as_deref(), Some("<mine/>"));
}

#[tokio::test]
async fn test_binary_document_opens_read_only_and_unlocked() {
    let service = service().with_document("/logo.png", BINARY_CONTENT_PLACEHOLDER);
    let f = tab(&service, ALICE);

    let state = f.coordinator.open_file_path("/logo.png").await.expect("open");

    assert_eq!(state, SessionState::ReadOnly);
    assert!(!f.service.is_locked("/logo.png"));
    assert_eq!(f.service.releases().len(), 1);
    assert!(f.tokens.get("/logo.png").is_none());
    let session = f.coordinator.store().get("/logo.png").await.expect("open");
    assert!(session.lock_token.is_none());
    assert_eq!(f.prompter.errors().len(), 1);
    assert!(f.prompter.errors()[0].contains("not a UTF-8 text document"));

    assert!(!f.coordinator.edit("/logo.png", "text").await.expect("edit"));
    assert!(f.service.stores().is_empty());
}
