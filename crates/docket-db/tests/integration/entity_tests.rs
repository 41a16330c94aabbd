//! Integration tests for EntityRepository.

use std::time::Duration;

use docket_core::models::{BatchOutcome, EntityBatch, NewCategory};
use docket_core::traits::EntityStore;
use docket_db::EntityRepository;

use crate::integration::common::{sample_contact, sample_matter, sample_user, setup_test_db};

const TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::test]
async fn test_upsert_creates_then_updates() {
    let (pool, _container) = setup_test_db().await;
    let repo = EntityRepository::new(pool);

    let batch = EntityBatch::Matters(vec![
        sample_matter(1, "Case Filed"),
        sample_matter(2, "RFE Received"),
    ]);
    let first = repo.upsert_batch(&batch, TIMEOUT).await.unwrap();
    assert_eq!(
        first,
        BatchOutcome {
            created: 2,
            updated: 0,
            skipped: 0
        }
    );

    let second = repo.upsert_batch(&batch, TIMEOUT).await.unwrap();
    assert_eq!(
        second,
        BatchOutcome {
            created: 0,
            updated: 2,
            skipped: 0
        }
    );

    let counts = repo.entity_counts().await.unwrap();
    assert_eq!(counts.matters, 2, "re-sync must not duplicate rows");

    let stored = repo.get_matter(2).await.unwrap().expect("matter exists");
    assert_eq!(stored.status_name.as_deref(), Some("RFE Received"));
    assert!(stored.last_synced_at.is_some());
    assert!(!stored.is_edited);
}

#[tokio::test]
async fn test_edited_matter_is_never_overwritten() {
    let (pool, _container) = setup_test_db().await;
    let repo = EntityRepository::new(pool);

    repo.upsert_batch(&EntityBatch::Matters(vec![sample_matter(7, "Case Filed")]), TIMEOUT)
        .await
        .unwrap();
    assert!(repo.mark_matter_edited(7, "paralegal@firm.example").await.unwrap());
    let before = repo.get_matter(7).await.unwrap().unwrap();

    let mut changed = sample_matter(7, "Approved");
    changed.title = "Remote title".to_string();
    let outcome = repo
        .upsert_batch(&EntityBatch::Matters(vec![changed]), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.updated, 0);

    let after = repo.get_matter(7).await.unwrap().unwrap();
    assert_eq!(after.title, before.title);
    assert_eq!(after.status_name.as_deref(), Some("Case Filed"));
    assert_eq!(after.last_synced_at, before.last_synced_at);
    assert_eq!(after.edited_by.as_deref(), Some("paralegal@firm.example"));
}

#[tokio::test]
async fn test_reference_reads() {
    let (pool, _container) = setup_test_db().await;
    let repo = EntityRepository::new(pool);

    repo.upsert_batch(&EntityBatch::Users(vec![sample_user(1, "Ann", "Lee")]), TIMEOUT)
        .await
        .unwrap();
    repo.upsert_batch(
        &EntityBatch::Contacts(vec![
            sample_contact(20, None),
            sample_contact(21, Some("Chan Imports")),
        ]),
        TIMEOUT,
    )
    .await
    .unwrap();
    repo.upsert_batch(
        &EntityBatch::Categories(vec![NewCategory {
            remote_id: 5,
            name: "Family".to_string(),
        }]),
        TIMEOUT,
    )
    .await
    .unwrap();

    let users = repo.user_names().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "Ann Lee");

    let mut contacts = repo.contact_names().await.unwrap();
    contacts.sort_by_key(|c| c.remote_id);
    assert_eq!(contacts[1].name, "Chan Imports");

    let counts = repo.entity_counts().await.unwrap();
    assert_eq!(counts.users, 1);
    assert_eq!(counts.contacts, 2);
    assert_eq!(counts.categories, 1);
    assert_eq!(counts.matters, 0);
}

#[tokio::test]
async fn test_detail_candidates_skip_assigned_and_edited() {
    let (pool, _container) = setup_test_db().await;
    let repo = EntityRepository::new(pool);

    let mut assigned = sample_matter(1, "Case Filed");
    assigned.assignee_id = Some(1);
    assigned.assignee_name = Some("Ann Lee".to_string());
    let batch = EntityBatch::Matters(vec![
        assigned,
        sample_matter(2, "Case Filed"),
        sample_matter(3, "Case Filed"),
        sample_matter(4, "Case Filed"),
    ]);
    repo.upsert_batch(&batch, TIMEOUT).await.unwrap();
    repo.mark_matter_edited(3, "staff").await.unwrap();

    let candidates = repo.detail_candidates(10).await.unwrap();
    assert_eq!(candidates, vec![2, 4]);

    let limited = repo.detail_candidates(1).await.unwrap();
    assert_eq!(limited.len(), 1);

    let counts = repo.entity_counts().await.unwrap();
    assert_eq!(counts.matters_with_assignee, 1);
}

#[tokio::test]
async fn test_failed_batch_rolls_back() {
    let (pool, _container) = setup_test_db().await;
    let repo = EntityRepository::new(pool.clone());

    // The constraint makes the second insert fail mid-transaction.
    let mut broken = sample_matter(2, "Case Filed");
    broken.title = "x".repeat(10);
    sqlx::query("ALTER TABLE matters ADD CONSTRAINT chk_title_len CHECK (length(title) < 10)")
        .execute(&pool)
        .await
        .unwrap();

    let batch = EntityBatch::Matters(vec![sample_matter(1, "Case Filed"), broken]);
    let result = repo.upsert_batch(&batch, TIMEOUT).await;
    assert!(result.is_err());

    let counts = repo.entity_counts().await.unwrap();
    assert_eq!(counts.matters, 0, "first record must be rolled back too");
}

#[tokio::test]
async fn test_matter_status_rows() {
    let (pool, _container) = setup_test_db().await;
    let repo = EntityRepository::new(pool);

    repo.upsert_batch(
        &EntityBatch::Matters(vec![
            sample_matter(1, "Case Filed"),
            sample_matter(2, "Approved"),
        ]),
        TIMEOUT,
    )
    .await
    .unwrap();

    let mut statuses: Vec<String> = repo
        .matter_status_rows()
        .await
        .unwrap()
        .into_iter()
        .filter_map(|r| r.status_name)
        .collect();
    statuses.sort();
    assert_eq!(statuses, vec!["Approved", "Case Filed"]);
}

#[tokio::test]
async fn test_empty_batch_is_noop() {
    let (pool, _container) = setup_test_db().await;
    let repo = EntityRepository::new(pool);

    let outcome = repo
        .upsert_batch(&EntityBatch::Users(Vec::new()), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(outcome, BatchOutcome::default());
}
