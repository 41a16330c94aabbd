//! Integration tests for SyncProgressRepository.

use docket_core::job::{SyncState, SyncType};
use docket_core::traits::SyncRegistry;
use docket_db::SyncProgressRepository;

use crate::integration::common::setup_test_db;

#[tokio::test]
async fn test_begin_creates_record() {
    let (pool, _container) = setup_test_db().await;
    let repo = SyncProgressRepository::new(pool);

    assert!(repo.get(7, SyncType::Full).await.unwrap().is_none());

    let progress = repo.begin(7, SyncType::Full).await.unwrap();
    assert_eq!(progress.status, SyncState::Syncing);
    assert_eq!(progress.total_processed, 0);
    assert!(progress.started_at.is_some());
}

#[tokio::test]
async fn test_counts_accumulate_and_begin_resets() {
    let (pool, _container) = setup_test_db().await;
    let repo = SyncProgressRepository::new(pool);

    repo.begin(7, SyncType::Full).await.unwrap();
    repo.add_counts(7, SyncType::Full, 40, 2).await.unwrap();
    repo.add_counts(7, SyncType::Full, 10, 0).await.unwrap();

    let progress = repo.get(7, SyncType::Full).await.unwrap().unwrap();
    assert_eq!(progress.total_processed, 50);
    assert_eq!(progress.total_failed, 2);
    assert_eq!(progress.status, SyncState::Syncing);

    assert!(
        repo.finish(7, SyncType::Full, SyncState::Failed, Some("boom"))
            .await
            .unwrap()
    );
    let restarted = repo.begin(7, SyncType::Full).await.unwrap();
    assert_eq!(restarted.total_processed, 0);
    assert_eq!(restarted.total_failed, 0);
    assert_eq!(restarted.failure_reason, None);

    assert_eq!(repo.list_for_actor(7).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_finish_is_compare_and_swap() {
    let (pool, _container) = setup_test_db().await;
    let repo = SyncProgressRepository::new(pool);

    repo.begin(7, SyncType::Full).await.unwrap();
    assert!(
        repo.finish(7, SyncType::Full, SyncState::Completed, None)
            .await
            .unwrap()
    );
    assert!(
        !repo
            .finish(7, SyncType::Full, SyncState::Failed, Some("late"))
            .await
            .unwrap(),
        "terminal record must not be overwritten"
    );

    let progress = repo.get(7, SyncType::Full).await.unwrap().unwrap();
    assert_eq!(progress.status, SyncState::Completed);
    assert_eq!(progress.failure_reason, None);
}

#[tokio::test]
async fn test_records_are_per_actor_and_type() {
    let (pool, _container) = setup_test_db().await;
    let repo = SyncProgressRepository::new(pool);

    repo.begin(7, SyncType::Full).await.unwrap();
    repo.begin(7, SyncType::Reference).await.unwrap();
    repo.begin(8, SyncType::Full).await.unwrap();
    repo.finish(7, SyncType::Reference, SyncState::Completed, None)
        .await
        .unwrap();

    assert_eq!(
        repo.get(7, SyncType::Full).await.unwrap().unwrap().status,
        SyncState::Syncing
    );
    assert_eq!(
        repo.get(8, SyncType::Full).await.unwrap().unwrap().status,
        SyncState::Syncing
    );
    assert_eq!(repo.list_for_actor(7).await.unwrap().len(), 2);
}
