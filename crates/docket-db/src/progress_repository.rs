//! Sync progress repository.
//!
//! One row per `(actor_id, sync_type)`, created on the first attempt and
//! updated in place afterwards. Terminal transitions are guarded by
//! `WHERE status = 'syncing'` so a late or duplicate writer cannot overwrite
//! an outcome that has already been recorded.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres};

use docket_core::error::AppError;
use docket_core::job::{SyncProgress, SyncState, SyncType};
use docket_core::traits::SyncRegistry;

/// PostgreSQL implementation of the progress registry.
#[derive(Clone)]
pub struct SyncProgressRepository {
    pool: Pool<Postgres>,
}

impl SyncProgressRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists every record of an actor, most recently updated first.
    pub async fn list_for_actor(&self, actor_id: i64) -> Result<Vec<SyncProgress>, AppError> {
        let rows: Vec<ProgressRow> = sqlx::query_as(
            r#"
            SELECT actor_id, sync_type, status, total_processed, total_failed,
                   failure_reason, started_at, updated_at
            FROM sync_progress
            WHERE actor_id = $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(actor_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SyncProgress::try_from).collect()
    }
}

// =============================================================================
// Helper Types for Database Mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct ProgressRow {
    actor_id: i64,
    sync_type: String,
    status: String,
    total_processed: i64,
    total_failed: i64,
    failure_reason: Option<String>,
    started_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProgressRow> for SyncProgress {
    type Error = AppError;

    fn try_from(row: ProgressRow) -> Result<Self, Self::Error> {
        let sync_type = row
            .sync_type
            .parse::<SyncType>()
            .map_err(|e| AppError::Generic(e.to_string()))?;
        let status = row
            .status
            .parse::<SyncState>()
            .map_err(|e| AppError::Generic(e.to_string()))?;

        Ok(Self {
            actor_id: row.actor_id,
            sync_type,
            status,
            total_processed: row.total_processed,
            total_failed: row.total_failed,
            failure_reason: row.failure_reason,
            started_at: row.started_at,
            updated_at: row.updated_at,
        })
    }
}

fn to_i64(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

// =============================================================================
// SyncRegistry Trait Implementation
// =============================================================================

impl SyncRegistry for SyncProgressRepository {
    async fn begin(&self, actor_id: i64, sync_type: SyncType) -> Result<SyncProgress, AppError> {
        let row: ProgressRow = sqlx::query_as(
            r#"
            INSERT INTO sync_progress (actor_id, sync_type, status, started_at, updated_at)
            VALUES ($1, $2, 'syncing', NOW(), NOW())
            ON CONFLICT (actor_id, sync_type)
            DO UPDATE SET
                status = 'syncing',
                total_processed = 0,
                total_failed = 0,
                failure_reason = NULL,
                started_at = NOW(),
                updated_at = NOW()
            RETURNING actor_id, sync_type, status, total_processed, total_failed,
                      failure_reason, started_at, updated_at
            "#,
        )
        .bind(actor_id)
        .bind(sync_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn add_counts(
        &self,
        actor_id: i64,
        sync_type: SyncType,
        processed: u64,
        failed: u64,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE sync_progress
            SET total_processed = total_processed + $3,
                total_failed = total_failed + $4,
                updated_at = NOW()
            WHERE actor_id = $1 AND sync_type = $2
            "#,
        )
        .bind(actor_id)
        .bind(sync_type.as_str())
        .bind(to_i64(processed))
        .bind(to_i64(failed))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn finish(
        &self,
        actor_id: i64,
        sync_type: SyncType,
        state: SyncState,
        failure_reason: Option<&str>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE sync_progress
            SET status = $3,
                failure_reason = $4,
                updated_at = NOW()
            WHERE actor_id = $1 AND sync_type = $2 AND status = 'syncing'
            "#,
        )
        .bind(actor_id)
        .bind(sync_type.as_str())
        .bind(state.as_str())
        .bind(failure_reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get(
        &self,
        actor_id: i64,
        sync_type: SyncType,
    ) -> Result<Option<SyncProgress>, AppError> {
        let row: Option<ProgressRow> = sqlx::query_as(
            r#"
            SELECT actor_id, sync_type, status, total_processed, total_failed,
                   failure_reason, started_at, updated_at
            FROM sync_progress
            WHERE actor_id = $1 AND sync_type = $2
            "#,
        )
        .bind(actor_id)
        .bind(sync_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(SyncProgress::try_from).transpose()
    }
}
