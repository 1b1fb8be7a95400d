//! Coordinator integration tests against fake transports.

use memsync::{QueryKey, QueryStatus, SyncConfig, SyncCoordinator, SyncError, TransportError};
use memsync_test_utils::{FailingTransport, InMemoryTransport, ManualTransport, sample_record};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Let spawned tasks run up to their next suspension point.
async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn rapid_keystrokes_coalesce_into_one_search() {
    let transport = Arc::new(InMemoryTransport::with_records(vec![sample_record(
        "a", "abc notes",
    )]));
    let coordinator = SyncCoordinator::new(transport.clone(), SyncConfig::default());

    coordinator.on_input_change("a");
    tokio::time::sleep(Duration::from_millis(50)).await;
    coordinator.on_input_change("ab");
    tokio::time::sleep(Duration::from_millis(50)).await;
    coordinator.on_input_change("abc");
    tokio::time::sleep(Duration::from_millis(400)).await;
    settle().await;

    assert_eq!(transport.search_calls(), vec!["abc".to_string()]);
    let entry = coordinator.entry(&QueryKey::Search("abc".to_string()));
    assert_eq!(entry.status, QueryStatus::Ready);
    assert_eq!(entry.records.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn input_below_quiet_period_never_fetches() {
    let transport = Arc::new(InMemoryTransport::new());
    let coordinator = SyncCoordinator::new(transport.clone(), SyncConfig::default());

    coordinator.on_input_change("a");
    tokio::time::sleep(Duration::from_millis(100)).await;
    coordinator.on_input_change("ab");
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(transport.search_calls(), Vec::<String>::new());
}

#[tokio::test]
async fn blank_input_clears_previous_search_without_fetch() {
    let transport = Arc::new(InMemoryTransport::with_records(vec![sample_record(
        "a",
        "rust notes",
    )]));
    let coordinator = SyncCoordinator::new(transport.clone(), SyncConfig::default());
    let key = QueryKey::Search("rust".to_string());

    coordinator.refresh_search("rust").await;
    assert_eq!(coordinator.entry(&key).status, QueryStatus::Ready);

    coordinator.on_input_change("   ");

    assert_eq!(transport.search_calls(), vec!["rust".to_string()]);
    assert_eq!(coordinator.entry(&key).status, QueryStatus::Idle);
}

#[tokio::test]
async fn later_search_response_wins_even_when_earlier_finishes_last() {
    let transport = Arc::new(ManualTransport::new());
    let coordinator = SyncCoordinator::new(transport.clone(), SyncConfig::default());
    let key = QueryKey::Search("rust".to_string());

    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.refresh_search("rust").await })
    };
    settle().await;
    let second = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.refresh_search("rust").await })
    };
    settle().await;
    assert_eq!(transport.pending_count(), 2);
    assert_eq!(coordinator.entry(&key).status, QueryStatus::Loading);

    let call_one = transport.take_next().expect("first parked call");
    let call_two = transport.take_next().expect("second parked call");

    // The newer request completes first; the older one straggles in after.
    call_two.resolve_records(vec![sample_record("new", "newer rust")]);
    call_one.resolve_records(vec![sample_record("old", "older rust")]);
    first.await.expect("first search");
    second.await.expect("second search");

    let entry = coordinator.entry(&key);
    assert_eq!(entry.status, QueryStatus::Ready);
    assert_eq!(entry.records, vec![sample_record("new", "newer rust")]);
}

#[tokio::test]
async fn search_failure_surfaces_error_detail() {
    let transport = Arc::new(FailingTransport::new(TransportError::Status {
        status: 500,
        message: "ranker down".to_string(),
    }));
    let coordinator = SyncCoordinator::new(transport, SyncConfig::default());
    let key = QueryKey::Search("rust".to_string());

    coordinator.refresh_search("rust").await;

    let entry = coordinator.entry(&key);
    assert_eq!(entry.status, QueryStatus::Error);
    assert_eq!(
        entry.error_detail,
        Some("server returned 500: ranker down".to_string())
    );
}

#[tokio::test]
async fn create_with_blank_text_is_rejected_before_transport() {
    let transport = Arc::new(InMemoryTransport::new());
    let coordinator = SyncCoordinator::new(transport.clone(), SyncConfig::default());

    let result = coordinator.create_memory("   ", BTreeMap::new()).await;

    assert!(matches!(result, Err(SyncError::Validation(_))));
    assert_eq!(transport.create_calls(), 0);
    assert_eq!(coordinator.entry(&QueryKey::List).status, QueryStatus::Idle);
}

#[tokio::test]
async fn create_success_refreshes_list() {
    let transport = Arc::new(InMemoryTransport::new());
    let coordinator = SyncCoordinator::new(transport.clone(), SyncConfig::default());
    let mut metadata = BTreeMap::new();
    metadata.insert("topic".to_string(), "notes".to_string());

    let id = coordinator
        .create_memory("remember this", metadata.clone())
        .await
        .expect("create");

    let entry = coordinator.entry(&QueryKey::List);
    assert_eq!(entry.status, QueryStatus::Ready);
    assert_eq!(entry.records.len(), 1);
    assert_eq!(entry.records[0].id, id);
    assert_eq!(entry.records[0].metadata, metadata);
    assert_eq!(transport.list_calls(), 1);
}

#[tokio::test]
async fn delete_success_refreshes_list_without_deleted_id() {
    let transport = Arc::new(InMemoryTransport::new());
    let coordinator = SyncCoordinator::new(transport.clone(), SyncConfig::default());
    let keep = coordinator
        .create_memory("keep", BTreeMap::new())
        .await
        .expect("create keep");
    let doomed = coordinator
        .create_memory("drop", BTreeMap::new())
        .await
        .expect("create drop");

    let deleted = coordinator.delete_memory(&doomed).await.expect("delete");

    assert!(deleted);
    let entry = coordinator.entry(&QueryKey::List);
    assert_eq!(entry.status, QueryStatus::Ready);
    assert!(entry.records.iter().all(|record| record.id != doomed));
    assert!(entry.records.iter().any(|record| record.id == keep));
}

#[tokio::test]
async fn failed_create_never_touches_the_list_cache() {
    let transport = Arc::new(FailingTransport::new(TransportError::Request(
        "connection refused".to_string(),
    )));
    let coordinator = SyncCoordinator::new(transport.clone(), SyncConfig::default());

    let result = coordinator.create_memory("text", BTreeMap::new()).await;

    assert!(matches!(result, Err(SyncError::Transport(_))));
    assert_eq!(transport.list_calls(), 0);
    assert_eq!(coordinator.entry(&QueryKey::List).status, QueryStatus::Idle);
}

#[tokio::test]
async fn failed_delete_never_touches_the_list_cache() {
    let transport = Arc::new(FailingTransport::new(TransportError::Request(
        "connection refused".to_string(),
    )));
    let coordinator = SyncCoordinator::new(transport.clone(), SyncConfig::default());

    let result = coordinator.delete_memory("mem-1").await;

    assert!(matches!(result, Err(SyncError::Transport(_))));
    assert_eq!(transport.list_calls(), 0);
    assert_eq!(coordinator.entry(&QueryKey::List).status, QueryStatus::Idle);
}

#[tokio::test]
async fn update_success_refreshes_list() {
    let transport = Arc::new(InMemoryTransport::new());
    let coordinator = SyncCoordinator::new(transport.clone(), SyncConfig::default());
    let id = coordinator
        .create_memory("draft", BTreeMap::new())
        .await
        .expect("create");

    let updated = coordinator
        .update_memory(&id, "final", BTreeMap::new())
        .await
        .expect("update");

    assert!(updated);
    let entry = coordinator.entry(&QueryKey::List);
    assert_eq!(entry.records[0].text, "final");
}

#[tokio::test]
async fn update_with_blank_text_is_rejected_before_transport() {
    let transport = Arc::new(InMemoryTransport::new());
    let coordinator = SyncCoordinator::new(transport.clone(), SyncConfig::default());

    let result = coordinator.update_memory("mem-1", " ", BTreeMap::new()).await;

    assert!(matches!(result, Err(SyncError::Validation(_))));
}

#[tokio::test]
async fn subscribers_observe_mutation_invalidate_then_ready() {
    let transport = Arc::new(InMemoryTransport::new());
    let coordinator = SyncCoordinator::new(transport, SyncConfig::default());
    let mut updates = coordinator.subscribe(&QueryKey::List);

    coordinator
        .create_memory("note", BTreeMap::new())
        .await
        .expect("create");

    let invalidated = updates.recv().await.expect("invalidate update");
    assert_eq!(invalidated.status, QueryStatus::Idle);
    let ready = updates.recv().await.expect("ready update");
    assert_eq!(ready.status, QueryStatus::Ready);
    assert_eq!(ready.records.len(), 1);
}
