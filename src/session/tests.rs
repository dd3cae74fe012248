use super::*;
use crate::service::mock::{mock_script, MockService};
use std::sync::Arc;

const TIMEOUT: Duration = Duration::from_secs(10);

fn session() -> EditSession {
    EditSession::open(mock_script("s1", "p1", "A", "Chapter 1"))
}

fn store() -> MockService {
    MockService::new().with_script(mock_script("s1", "p1", "A", "Chapter 1"))
}

#[test]
fn opens_clean() {
    let session = session();
    assert!(!session.is_dirty());
    assert!(session.can_analyze());
    assert!(!session.can_save());
    assert_eq!(session.working(), session.baseline());
}

#[test]
fn dirty_tracks_working_against_baseline_for_every_edit() {
    let session = session();
    let edits: Vec<(Option<&str>, Option<&str>)> = vec![
        (Some("A*"), None),
        (Some("A"), None),
        (None, Some("Chapter 1, revised")),
        (Some("B"), Some("Chapter 1")),
        (Some("A"), None),
        (None, Some("")),
        (None, Some("Chapter 1")),
        (Some("A"), Some("Chapter 1")),
    ];

    for (title, content) in edits {
        let dirty = session.edit(title.map(String::from), content.map(String::from));
        let expected = session.working() != session.baseline();
        assert_eq!(dirty, expected);
        assert_eq!(session.is_dirty(), expected);
        assert_eq!(session.can_analyze(), !expected);
    }
    assert!(!session.is_dirty());
}

#[test]
fn reverting_an_edit_makes_the_session_clean_again() {
    let session = session();
    assert!(session.edit(Some("A*".into()), None));
    assert!(!session.edit(Some("A".into()), None));
}

#[tokio::test]
async fn save_persists_working_copy_and_resets_baseline() {
    let store = store();
    let session = session();
    session.edit(Some("A*".into()), Some("Chapter 1\nIt was dark.".into()));

    let saved = session.save(&store, TIMEOUT).await.unwrap();
    assert_eq!(saved.title, "A*");
    assert!(!session.is_dirty());
    assert_eq!(session.baseline(), Draft::new("A*", "Chapter 1\nIt was dark."));
    assert_eq!(session.persisted(), saved);
    assert_eq!(store.stored_script("s1").unwrap().title, "A*");
}

#[tokio::test]
async fn saving_a_clean_session_does_no_io() {
    let store = store();
    let session = session();

    let script = session.save(&store, TIMEOUT).await.unwrap();
    assert_eq!(script.title, "A");
    assert_eq!(store.update_count(), 0);
}

#[tokio::test]
async fn empty_title_is_rejected_locally() {
    let store = store();
    let session = session();
    session.edit(Some("   ".into()), None);

    let err = session.save(&store, TIMEOUT).await.unwrap_err();
    assert!(matches!(err, SaveError::Validation(_)));
    assert_eq!(store.update_count(), 0);
    assert!(session.is_dirty());
}

#[tokio::test]
async fn failed_save_leaves_session_untouched() {
    let store = store();
    store.queue_update_failure(ServiceError::Transport("connection refused".into()));
    let session = session();
    session.edit(Some("A*".into()), None);

    let err = session.save(&store, TIMEOUT).await.unwrap_err();
    assert!(matches!(err, SaveError::Network(ServiceError::Transport(_))));
    assert!(session.is_dirty());
    assert!(!session.is_saving());
    assert_eq!(session.baseline(), Draft::new("A", "Chapter 1"));
    assert_eq!(session.working().title, "A*");

    // retry succeeds
    session.save(&store, TIMEOUT).await.unwrap();
    assert!(!session.is_dirty());
}

#[tokio::test]
async fn server_validation_maps_to_validation_error() {
    let store = store();
    store.queue_update_failure(ServiceError::Api {
        status: 422,
        message: "title: field required".into(),
    });
    let session = session();
    session.edit(Some("A*".into()), None);

    let err = session.save(&store, TIMEOUT).await.unwrap_err();
    assert!(matches!(err, SaveError::Validation(_)));
}

#[tokio::test(start_paused = true)]
async fn save_times_out() {
    let store = store();
    store.set_update_delay(Duration::from_secs(60));
    let session = session();
    session.edit(Some("A*".into()), None);

    let err = session.save(&store, TIMEOUT).await.unwrap_err();
    assert_eq!(err, SaveError::Network(ServiceError::Timeout));
    assert!(session.is_dirty());
    assert!(!session.is_saving());
}

#[tokio::test(start_paused = true)]
async fn concurrent_save_is_rejected() {
    let store = Arc::new(store());
    store.set_update_delay(Duration::from_millis(500));
    let session = Arc::new(session());
    session.edit(Some("A*".into()), None);

    let first = {
        let store = store.clone();
        let session = session.clone();
        tokio::spawn(async move { session.save(store.as_ref(), TIMEOUT).await })
    };
    tokio::task::yield_now().await;
    assert!(session.is_saving());
    assert!(!session.can_save());

    let second = session.save(store.as_ref(), TIMEOUT).await;
    assert_eq!(second, Err(SaveError::AlreadyInProgress));

    first.await.unwrap().unwrap();
    assert_eq!(store.update_count(), 1);
    assert!(!session.is_saving());
}

#[tokio::test(start_paused = true)]
async fn edits_during_a_save_keep_the_session_dirty() {
    let store = Arc::new(store());
    store.set_update_delay(Duration::from_millis(500));
    let session = Arc::new(session());
    session.edit(Some("A*".into()), None);

    let pending = {
        let store = store.clone();
        let session = session.clone();
        tokio::spawn(async move { session.save(store.as_ref(), TIMEOUT).await })
    };
    tokio::task::yield_now().await;
    session.edit(None, Some("Chapter 1, typed while saving".into()));

    pending.await.unwrap().unwrap();
    assert_eq!(session.baseline(), Draft::new("A*", "Chapter 1"));
    assert!(session.is_dirty());
    assert!(!session.can_analyze());
}

#[test]
fn stats_follow_the_working_copy() {
    let session = session();
    assert_eq!(session.stats().words, 2);
    session.edit(None, Some("one two three".into()));
    assert_eq!(session.stats().words, 3);
    assert_eq!(session.stats().characters, 13);
}

#[test]
fn sessions_get_distinct_ids() {
    assert_ne!(session().id(), session().id());
}
