//! Entity repository for the locally mirrored practice data.
//!
//! Each entity kind has its own table keyed by `remote_id`. Upserts use
//! `INSERT ... ON CONFLICT (remote_id) DO UPDATE ... WHERE NOT is_edited`, so
//! a row edited by a person is neither overwritten nor re-stamped, and the
//! statement returns no row for it.

use std::time::Duration;

use docket_core::error::AppError;
use docket_core::models::{
    BatchOutcome, EntityBatch, ExistingRow, Matter, MatterStatusRow, NamedRef, NewCategory,
    NewContact, NewMatter, NewMatterStatus, NewMatterType, NewUser, UpsertAction,
    decide_upsert,
};
use docket_core::traits::EntityStore;
use docket_core::EntityCounts;
use sqlx::{PgConnection, PgPool, Pool, Postgres};
use tracing::debug;

/// Column list for matter reads. Must remain a const literal since it is
/// spliced into SQL with `format!`.
const MATTER_COLUMNS: &str = "id, remote_id, title, number, description, client_id, client_name, assignee_id, assignee_name, matter_type_id, matter_type_name, status_id, status_name, opened_at, closed_at, deadline, remote_updated_at, is_edited, edited_by, edited_at, last_synced_at";

/// Repository for users, contacts, categories, matter types, matter statuses
/// and matters.
///
/// # Examples
///
/// ```no_run
/// use sqlx::postgres::PgPoolOptions;
/// use docket_db::EntityRepository;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = PgPoolOptions::new()
///     .max_connections(5)
///     .connect("postgresql://localhost/docket")
///     .await?;
///
/// let repo = EntityRepository::new(pool);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EntityRepository {
    pool: Pool<Postgres>,
}

impl EntityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Marks a matter as edited locally. Returns false if no such matter exists.
    ///
    /// Once marked, sync leaves the row alone until the flag is cleared.
    pub async fn mark_matter_edited(&self, remote_id: i64, edited_by: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE matters
            SET is_edited = TRUE, edited_by = $2, edited_at = NOW()
            WHERE remote_id = $1
            "#,
        )
        .bind(remote_id)
        .bind(edited_by)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn write_batch(&self, batch: &EntityBatch, timeout: Duration) -> Result<BatchOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        // SET does not accept bind parameters; the value is an integer.
        let set_timeout = format!("SET LOCAL statement_timeout = {}", timeout.as_millis());
        sqlx::query(&set_timeout).execute(&mut *tx).await?;

        let mut outcome = BatchOutcome::default();
        match batch {
            EntityBatch::Users(records) => {
                for record in records {
                    outcome.record(upsert_user(&mut tx, record).await?);
                }
            }
            EntityBatch::Contacts(records) => {
                for record in records {
                    outcome.record(upsert_contact(&mut tx, record).await?);
                }
            }
            EntityBatch::Categories(records) => {
                for record in records {
                    outcome.record(upsert_category(&mut tx, record).await?);
                }
            }
            EntityBatch::MatterTypes(records) => {
                for record in records {
                    outcome.record(upsert_matter_type(&mut tx, record).await?);
                }
            }
            EntityBatch::MatterStatuses(records) => {
                for record in records {
                    outcome.record(upsert_matter_status(&mut tx, record).await?);
                }
            }
            EntityBatch::Matters(records) => {
                for record in records {
                    outcome.record(upsert_matter(&mut tx, record).await?);
                }
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }
}

// =============================================================================
// Per-kind upserts
// =============================================================================

/// Recovers the row an upsert ran into from its `RETURNING (xmax = 0)` result.
///
/// No row means the conflict target was edited and the update was filtered
/// out. `xmax = 0` holds only for freshly inserted tuples.
fn existing_row(inserted: Option<bool>) -> Option<ExistingRow> {
    match inserted {
        None => Some(ExistingRow { is_edited: true }),
        Some(true) => None,
        Some(false) => Some(ExistingRow { is_edited: false }),
    }
}

fn written_action(inserted: Option<bool>) -> UpsertAction {
    decide_upsert(existing_row(inserted))
}

async fn upsert_user(conn: &mut PgConnection, user: &NewUser) -> Result<UpsertAction, AppError> {
    let row: Option<(bool,)> = sqlx::query_as(
        r#"
        INSERT INTO users (remote_id, email, first_name, last_name, full_name, role, active, last_synced_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        ON CONFLICT (remote_id)
        DO UPDATE SET
            email = EXCLUDED.email,
            first_name = EXCLUDED.first_name,
            last_name = EXCLUDED.last_name,
            full_name = EXCLUDED.full_name,
            role = EXCLUDED.role,
            active = EXCLUDED.active,
            last_synced_at = NOW()
        WHERE users.is_edited = FALSE
        RETURNING (xmax = 0)
        "#,
    )
    .bind(user.remote_id)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.full_name)
    .bind(&user.role)
    .bind(user.active)
    .fetch_optional(conn)
    .await?;

    Ok(written_action(row.map(|r| r.0)))
}

async fn upsert_contact(
    conn: &mut PgConnection,
    contact: &NewContact,
) -> Result<UpsertAction, AppError> {
    let row: Option<(bool,)> = sqlx::query_as(
        r#"
        INSERT INTO contacts (
            remote_id, first_name, last_name, company_name, display_name,
            email, phone, contact_type, last_synced_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
        ON CONFLICT (remote_id)
        DO UPDATE SET
            first_name = EXCLUDED.first_name,
            last_name = EXCLUDED.last_name,
            company_name = EXCLUDED.company_name,
            display_name = EXCLUDED.display_name,
            email = EXCLUDED.email,
            phone = EXCLUDED.phone,
            contact_type = EXCLUDED.contact_type,
            last_synced_at = NOW()
        WHERE contacts.is_edited = FALSE
        RETURNING (xmax = 0)
        "#,
    )
    .bind(contact.remote_id)
    .bind(&contact.first_name)
    .bind(&contact.last_name)
    .bind(&contact.company_name)
    .bind(&contact.display_name)
    .bind(&contact.email)
    .bind(&contact.phone)
    .bind(&contact.contact_type)
    .fetch_optional(conn)
    .await?;

    Ok(written_action(row.map(|r| r.0)))
}

async fn upsert_category(
    conn: &mut PgConnection,
    category: &NewCategory,
) -> Result<UpsertAction, AppError> {
    let row: Option<(bool,)> = sqlx::query_as(
        r#"
        INSERT INTO categories (remote_id, name, last_synced_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (remote_id)
        DO UPDATE SET
            name = EXCLUDED.name,
            last_synced_at = NOW()
        WHERE categories.is_edited = FALSE
        RETURNING (xmax = 0)
        "#,
    )
    .bind(category.remote_id)
    .bind(&category.name)
    .fetch_optional(conn)
    .await?;

    Ok(written_action(row.map(|r| r.0)))
}

async fn upsert_matter_type(
    conn: &mut PgConnection,
    matter_type: &NewMatterType,
) -> Result<UpsertAction, AppError> {
    let row: Option<(bool,)> = sqlx::query_as(
        r#"
        INSERT INTO matter_types (remote_id, name, category_id, category_name, last_synced_at)
        VALUES ($1, $2, $3, $4, NOW())
        ON CONFLICT (remote_id)
        DO UPDATE SET
            name = EXCLUDED.name,
            category_id = EXCLUDED.category_id,
            category_name = EXCLUDED.category_name,
            last_synced_at = NOW()
        WHERE matter_types.is_edited = FALSE
        RETURNING (xmax = 0)
        "#,
    )
    .bind(matter_type.remote_id)
    .bind(&matter_type.name)
    .bind(matter_type.category_id)
    .bind(&matter_type.category_name)
    .fetch_optional(conn)
    .await?;

    Ok(written_action(row.map(|r| r.0)))
}

async fn upsert_matter_status(
    conn: &mut PgConnection,
    status: &NewMatterStatus,
) -> Result<UpsertAction, AppError> {
    let row: Option<(bool,)> = sqlx::query_as(
        r#"
        INSERT INTO matter_statuses (remote_id, name, matter_type_id, position, last_synced_at)
        VALUES ($1, $2, $3, $4, NOW())
        ON CONFLICT (remote_id)
        DO UPDATE SET
            name = EXCLUDED.name,
            matter_type_id = EXCLUDED.matter_type_id,
            position = EXCLUDED.position,
            last_synced_at = NOW()
        WHERE matter_statuses.is_edited = FALSE
        RETURNING (xmax = 0)
        "#,
    )
    .bind(status.remote_id)
    .bind(&status.name)
    .bind(status.matter_type_id)
    .bind(status.position)
    .fetch_optional(conn)
    .await?;

    Ok(written_action(row.map(|r| r.0)))
}

async fn upsert_matter(conn: &mut PgConnection, matter: &NewMatter) -> Result<UpsertAction, AppError> {
    let row: Option<(bool,)> = sqlx::query_as(
        r#"
        INSERT INTO matters (
            remote_id, title, number, description,
            client_id, client_name, assignee_id, assignee_name,
            matter_type_id, matter_type_name, status_id, status_name,
            opened_at, closed_at, deadline, remote_updated_at, metadata,
            last_synced_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, NOW())
        ON CONFLICT (remote_id)
        DO UPDATE SET
            title = EXCLUDED.title,
            number = EXCLUDED.number,
            description = EXCLUDED.description,
            client_id = EXCLUDED.client_id,
            client_name = EXCLUDED.client_name,
            assignee_id = EXCLUDED.assignee_id,
            assignee_name = EXCLUDED.assignee_name,
            matter_type_id = EXCLUDED.matter_type_id,
            matter_type_name = EXCLUDED.matter_type_name,
            status_id = EXCLUDED.status_id,
            status_name = EXCLUDED.status_name,
            opened_at = EXCLUDED.opened_at,
            closed_at = EXCLUDED.closed_at,
            deadline = EXCLUDED.deadline,
            remote_updated_at = EXCLUDED.remote_updated_at,
            metadata = EXCLUDED.metadata,
            last_synced_at = NOW()
        WHERE matters.is_edited = FALSE
        RETURNING (xmax = 0)
        "#,
    )
    .bind(matter.remote_id)
    .bind(&matter.title)
    .bind(&matter.number)
    .bind(&matter.description)
    .bind(matter.client_id)
    .bind(&matter.client_name)
    .bind(matter.assignee_id)
    .bind(&matter.assignee_name)
    .bind(matter.matter_type_id)
    .bind(&matter.matter_type_name)
    .bind(matter.status_id)
    .bind(&matter.status_name)
    .bind(matter.opened_at)
    .bind(matter.closed_at)
    .bind(matter.deadline)
    .bind(matter.remote_updated_at)
    .bind(&matter.metadata)
    .fetch_optional(conn)
    .await?;

    Ok(written_action(row.map(|r| r.0)))
}

// =============================================================================
// EntityStore Trait Implementation
// =============================================================================

impl EntityStore for EntityRepository {
    async fn upsert_batch(
        &self,
        batch: &EntityBatch,
        timeout: Duration,
    ) -> Result<BatchOutcome, AppError> {
        if batch.is_empty() {
            return Ok(BatchOutcome::default());
        }

        // Dropping the unfinished future drops the transaction, which rolls back.
        let outcome = tokio::time::timeout(timeout, self.write_batch(batch, timeout))
            .await
            .map_err(|_| AppError::Timeout(timeout.as_secs()))??;

        debug!(
            kind = %batch.kind(),
            records = batch.len(),
            created = outcome.created,
            updated = outcome.updated,
            skipped = outcome.skipped,
            "Batch committed"
        );
        Ok(outcome)
    }

    async fn user_names(&self) -> Result<Vec<NamedRef>, AppError> {
        let rows: Vec<NamedRef> =
            sqlx::query_as("SELECT remote_id, full_name AS name FROM users")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    async fn contact_names(&self) -> Result<Vec<NamedRef>, AppError> {
        let rows: Vec<NamedRef> = sqlx::query_as(
            "SELECT remote_id, display_name AS name FROM contacts",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn matter_type_names(&self) -> Result<Vec<NamedRef>, AppError> {
        let rows: Vec<NamedRef> = sqlx::query_as("SELECT remote_id, name FROM matter_types")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn matter_status_names(&self) -> Result<Vec<NamedRef>, AppError> {
        let rows: Vec<NamedRef> = sqlx::query_as("SELECT remote_id, name FROM matter_statuses")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn entity_counts(&self) -> Result<EntityCounts, AppError> {
        let row: CountsRow = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM contacts) AS contacts,
                (SELECT COUNT(*) FROM matter_types) AS matter_types,
                (SELECT COUNT(*) FROM matter_statuses) AS matter_statuses,
                (SELECT COUNT(*) FROM categories) AS categories,
                (SELECT COUNT(*) FROM matters) AS matters,
                (SELECT COUNT(*) FROM matters WHERE assignee_name IS NOT NULL) AS matters_with_assignee
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn detail_candidates(&self, limit: usize) -> Result<Vec<i64>, AppError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT remote_id
            FROM matters
            WHERE assignee_name IS NULL AND is_edited = FALSE
            ORDER BY last_synced_at ASC NULLS FIRST, remote_id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn matter_status_rows(&self) -> Result<Vec<MatterStatusRow>, AppError> {
        let rows: Vec<MatterStatusRow> = sqlx::query_as(
            "SELECT status_name, deadline, remote_updated_at FROM matters",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_matter(&self, remote_id: i64) -> Result<Option<Matter>, AppError> {
        let query = format!("SELECT {} FROM matters WHERE remote_id = $1", MATTER_COLUMNS);
        let row: Option<Matter> = sqlx::query_as(&query)
            .bind(remote_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}

// =============================================================================
// Helper Types for Database Mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct CountsRow {
    users: i64,
    contacts: i64,
    matter_types: i64,
    matter_statuses: i64,
    categories: i64,
    matters: i64,
    matters_with_assignee: i64,
}

impl From<CountsRow> for EntityCounts {
    fn from(row: CountsRow) -> Self {
        Self {
            users: row.users,
            contacts: row.contacts,
            matter_types: row.matter_types,
            matter_statuses: row.matter_statuses,
            categories: row.categories,
            matters: row.matters,
            matters_with_assignee: row.matters_with_assignee,
        }
    }
}
