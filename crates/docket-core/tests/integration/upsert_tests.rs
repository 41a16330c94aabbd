//! Integration tests for UpsertEngine.

use crate::integration::common::{CountingReporter, MockEntityStore, test_config};
use docket_core::{EntityKind, NewMatter, NewUser, SilentSyncReporter, UpsertEngine};

fn user(id: i64, name: &str) -> NewUser {
    NewUser {
        remote_id: id,
        email: None,
        first_name: Some(name.to_string()),
        last_name: None,
        full_name: name.to_string(),
        role: None,
        active: true,
    }
}

fn matter(id: i64, status: &str) -> NewMatter {
    NewMatter {
        remote_id: id,
        title: format!("Matter {}", id),
        number: None,
        description: None,
        client_id: None,
        client_name: None,
        assignee_id: None,
        assignee_name: None,
        matter_type_id: None,
        matter_type_name: None,
        status_id: None,
        status_name: Some(status.to_string()),
        opened_at: None,
        closed_at: None,
        deadline: None,
        remote_updated_at: None,
        metadata: serde_json::json!({}),
    }
}

/// Re-applying the same records creates nothing new.
#[tokio::test]
async fn test_apply_is_idempotent() {
    let store = MockEntityStore::new();
    let config = test_config();
    let engine = UpsertEngine::new(&store, &config, &SilentSyncReporter);

    let users: Vec<NewUser> = (1..=3).map(|i| user(i, "Ann")).collect();

    let first = engine.apply_batch(users.clone()).await;
    assert_eq!(first.created, 3);
    assert_eq!(first.updated, 0);

    let second = engine.apply_batch(users).await;
    assert_eq!(second.created, 0, "second pass must not create rows");
    assert_eq!(second.updated, 3);
    assert_eq!(store.count(EntityKind::User), 3);
}

/// Edited rows are never written, not even their sync timestamp.
#[tokio::test]
async fn test_edited_rows_are_skipped() {
    let store = MockEntityStore::new();
    let config = test_config();
    let engine = UpsertEngine::new(&store, &config, &SilentSyncReporter);

    engine.apply_batch(vec![matter(7, "Drafting")]).await;
    store.mark_edited(EntityKind::Matter, 7);
    let synced_before = store.last_synced(EntityKind::Matter, 7);

    let stats = engine.apply_batch(vec![matter(7, "Case Filed")]).await;

    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.updated, 0);
    assert_eq!(
        store.matter(7).unwrap().status_name.as_deref(),
        Some("Drafting")
    );
    assert_eq!(store.last_synced(EntityKind::Matter, 7), synced_before);
}

/// Records are written in chunks of the configured batch size.
#[tokio::test]
async fn test_records_are_chunked_into_batches() {
    let store = MockEntityStore::new();
    let config = test_config().with_batch_size(50);
    let reporter = CountingReporter::default();
    let engine = UpsertEngine::new(&store, &config, &reporter);

    let matters: Vec<NewMatter> = (1..=120).map(|i| matter(i, "Pending")).collect();
    let stats = engine.apply_batch(matters).await;

    assert_eq!(stats.fetched, 120);
    assert_eq!(stats.created, 120);
    assert_eq!(store.batch_calls(), 3);
    assert_eq!(reporter.committed(), 3, "one log line per batch");
}

/// A failing batch is rolled back and later batches still run.
#[tokio::test]
async fn test_failed_batch_is_isolated() {
    let store = MockEntityStore::new();
    let config = test_config().with_batch_size(2);
    let reporter = CountingReporter::default();
    let engine = UpsertEngine::new(&store, &config, &reporter);

    // Batches: [1, 2], [3, 4], [5]; the second one fails.
    store.poison(4);
    let users: Vec<NewUser> = (1..=5).map(|i| user(i, "Raj")).collect();
    let stats = engine.apply_batch(users).await;

    assert_eq!(stats.created, 3);
    assert_eq!(stats.failed, 2);
    assert_eq!(reporter.committed(), 2);
    assert_eq!(reporter.failed(), 1);
    assert_eq!(store.count(EntityKind::User), 3);
}

#[tokio::test]
async fn test_empty_input_makes_no_store_calls() {
    let store = MockEntityStore::new();
    let config = test_config();
    let engine = UpsertEngine::new(&store, &config, &SilentSyncReporter);

    let stats = engine.apply_batch(Vec::<NewUser>::new()).await;
    assert_eq!(stats.processed(), 0);
    assert_eq!(store.batch_calls(), 0);
}
