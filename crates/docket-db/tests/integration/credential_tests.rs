//! Integration tests for CredentialRepository.

use chrono::{Duration, Utc};
use docket_core::traits::TokenProvider;
use docket_db::CredentialRepository;

use crate::integration::common::setup_test_db;

#[tokio::test]
async fn test_missing_credential_is_none() {
    let (pool, _container) = setup_test_db().await;
    let repo = CredentialRepository::new(pool);

    assert_eq!(repo.get_token(7).await.unwrap(), None);
}

#[tokio::test]
async fn test_latest_unexpired_token_wins() {
    let (pool, _container) = setup_test_db().await;
    let repo = CredentialRepository::new(pool);

    repo.store(7, "old", None).await.unwrap();
    repo.store(7, "current", Some(Utc::now() + Duration::hours(1)))
        .await
        .unwrap();
    repo.store(8, "other-actor", None).await.unwrap();

    assert_eq!(repo.get_token(7).await.unwrap().as_deref(), Some("current"));
}

#[tokio::test]
async fn test_expired_token_is_ignored() {
    let (pool, _container) = setup_test_db().await;
    let repo = CredentialRepository::new(pool);

    repo.store(7, "expired", Some(Utc::now() - Duration::minutes(5)))
        .await
        .unwrap();
    assert_eq!(repo.get_token(7).await.unwrap(), None);

    repo.store(7, "fresh", None).await.unwrap();
    assert_eq!(repo.get_token(7).await.unwrap().as_deref(), Some("fresh"));
}
