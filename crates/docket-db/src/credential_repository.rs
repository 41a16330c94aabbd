//! Stored API credentials.

use sqlx::{PgPool, Pool, Postgres};

use docket_core::error::AppError;
use docket_core::traits::TokenProvider;

/// Reads bearer tokens saved by the connect flow of the dashboard.
///
/// The most recently stored token that has not expired wins. Tokens without
/// an expiry never expire.
#[derive(Clone)]
pub struct CredentialRepository {
    pool: Pool<Postgres>,
}

impl CredentialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stores a token for an actor.
    pub async fn store(
        &self,
        actor_id: i64,
        access_token: &str,
        expires_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO api_credentials (actor_id, access_token, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(actor_id)
        .bind(access_token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl TokenProvider for CredentialRepository {
    async fn get_token(&self, actor_id: i64) -> Result<Option<String>, AppError> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT access_token
            FROM api_credentials
            WHERE actor_id = $1
              AND (expires_at IS NULL OR expires_at > NOW())
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(actor_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.0))
    }
}
