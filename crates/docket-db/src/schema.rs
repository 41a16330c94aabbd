//! Database schema.
//!
//! Statements are idempotent (`IF NOT EXISTS`) and executed one at a time,
//! since a prepared statement cannot contain more than one command.

use docket_core::error::AppError;
use sqlx::PgPool;
use tracing::debug;

/// DDL for every table the sync engine reads or writes.
pub const STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        remote_id BIGINT NOT NULL UNIQUE,
        email TEXT,
        first_name TEXT,
        last_name TEXT,
        full_name TEXT NOT NULL,
        role TEXT,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        is_edited BOOLEAN NOT NULL DEFAULT FALSE,
        edited_by TEXT,
        edited_at TIMESTAMPTZ,
        last_synced_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS contacts (
        id BIGSERIAL PRIMARY KEY,
        remote_id BIGINT NOT NULL UNIQUE,
        first_name TEXT,
        last_name TEXT,
        company_name TEXT,
        display_name TEXT NOT NULL,
        email TEXT,
        phone TEXT,
        contact_type TEXT,
        is_edited BOOLEAN NOT NULL DEFAULT FALSE,
        edited_by TEXT,
        edited_at TIMESTAMPTZ,
        last_synced_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS categories (
        id BIGSERIAL PRIMARY KEY,
        remote_id BIGINT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        is_edited BOOLEAN NOT NULL DEFAULT FALSE,
        edited_by TEXT,
        edited_at TIMESTAMPTZ,
        last_synced_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS matter_types (
        id BIGSERIAL PRIMARY KEY,
        remote_id BIGINT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        category_id BIGINT,
        category_name TEXT,
        is_edited BOOLEAN NOT NULL DEFAULT FALSE,
        edited_by TEXT,
        edited_at TIMESTAMPTZ,
        last_synced_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS matter_statuses (
        id BIGSERIAL PRIMARY KEY,
        remote_id BIGINT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        matter_type_id BIGINT,
        position INTEGER,
        is_edited BOOLEAN NOT NULL DEFAULT FALSE,
        edited_by TEXT,
        edited_at TIMESTAMPTZ,
        last_synced_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS matters (
        id BIGSERIAL PRIMARY KEY,
        remote_id BIGINT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        number TEXT,
        description TEXT,
        client_id BIGINT,
        client_name TEXT,
        assignee_id BIGINT,
        assignee_name TEXT,
        matter_type_id BIGINT,
        matter_type_name TEXT,
        status_id BIGINT,
        status_name TEXT,
        opened_at TIMESTAMPTZ,
        closed_at TIMESTAMPTZ,
        deadline DATE,
        remote_updated_at TIMESTAMPTZ,
        metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
        is_edited BOOLEAN NOT NULL DEFAULT FALSE,
        edited_by TEXT,
        edited_at TIMESTAMPTZ,
        last_synced_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_matters_detail_candidates ON matters (last_synced_at) WHERE assignee_name IS NULL AND is_edited = FALSE",
    r#"CREATE TABLE IF NOT EXISTS sync_progress (
        actor_id BIGINT NOT NULL,
        sync_type VARCHAR(32) NOT NULL,
        status VARCHAR(16) NOT NULL DEFAULT 'idle',
        total_processed BIGINT NOT NULL DEFAULT 0,
        total_failed BIGINT NOT NULL DEFAULT 0,
        failure_reason TEXT,
        started_at TIMESTAMPTZ,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (actor_id, sync_type),
        CONSTRAINT chk_sync_progress_status CHECK (status IN ('idle', 'syncing', 'completed', 'failed'))
    )"#,
    r#"CREATE TABLE IF NOT EXISTS api_credentials (
        id BIGSERIAL PRIMARY KEY,
        actor_id BIGINT NOT NULL,
        access_token TEXT NOT NULL,
        expires_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_api_credentials_actor ON api_credentials (actor_id, created_at DESC)",
];

/// Creates any missing tables and indexes.
pub async fn apply(pool: &PgPool) -> Result<(), AppError> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    debug!(statements = STATEMENTS.len(), "Schema applied");
    Ok(())
}
