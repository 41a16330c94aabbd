//! Local entity types.
//!
//! Every synced entity is identified by the remote service's integer id
//! (`remote_id`), unique per entity kind. The `New*` records carry exactly the
//! synced fields; edit provenance (`is_edited`, `edited_by`, `edited_at`) and
//! `last_synced_at` are owned by the store and never part of an upsert payload.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a locally mirrored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Contact,
    MatterType,
    MatterStatus,
    Category,
    Matter,
}

impl EntityKind {
    /// Returns the string representation used in logs and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Contact => "contact",
            EntityKind::MatterType => "matter_type",
            EntityKind::MatterStatus => "matter_status",
            EntityKind::Category => "category",
            EntityKind::Matter => "matter",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A firm member who can be assigned to matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub remote_id: i64,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: String,
    pub role: Option<String>,
    pub active: bool,
}

/// A client (person or organization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContact {
    pub remote_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    pub display_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub contact_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMatterType {
    pub remote_id: i64,
    pub name: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMatterStatus {
    pub remote_id: i64,
    pub name: String,
    pub matter_type_id: Option<i64>,
    pub position: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCategory {
    pub remote_id: i64,
    pub name: String,
}

/// A case ("matter") with its foreign references already denormalized into
/// display names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMatter {
    pub remote_id: i64,
    pub title: String,
    pub number: Option<String>,
    pub description: Option<String>,
    pub client_id: Option<i64>,
    pub client_name: Option<String>,
    pub assignee_id: Option<i64>,
    pub assignee_name: Option<String>,
    pub matter_type_id: Option<i64>,
    pub matter_type_name: Option<String>,
    pub status_id: Option<i64>,
    pub status_name: Option<String>,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub deadline: Option<NaiveDate>,
    pub remote_updated_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

/// A stored matter, including local bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Matter {
    /// Local surrogate key.
    pub id: i64,
    pub remote_id: i64,
    pub title: String,
    pub number: Option<String>,
    pub description: Option<String>,
    pub client_id: Option<i64>,
    pub client_name: Option<String>,
    pub assignee_id: Option<i64>,
    pub assignee_name: Option<String>,
    pub matter_type_id: Option<i64>,
    pub matter_type_name: Option<String>,
    pub status_id: Option<i64>,
    pub status_name: Option<String>,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub deadline: Option<NaiveDate>,
    pub remote_updated_at: Option<DateTime<Utc>>,
    pub is_edited: bool,
    pub edited_by: Option<String>,
    pub edited_at: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Minimal projection of a matter used for reporting.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MatterStatusRow {
    pub status_name: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub remote_updated_at: Option<DateTime<Utc>>,
}

/// A stored entity reduced to its remote id and name.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct NamedRef {
    pub remote_id: i64,
    pub name: String,
}

/// Computes the display name of a person or organization.
///
/// The company name wins when present; otherwise first and last name are
/// joined and trimmed; otherwise `fallback` is used.
///
/// # Examples
///
/// ```
/// use docket_core::models::display_name;
///
/// assert_eq!(display_name(Some("Acme LLC"), Some("Ann"), Some("Lee"), "Unknown"), "Acme LLC");
/// assert_eq!(display_name(None, Some("Ann"), None, "Unknown"), "Ann");
/// assert_eq!(display_name(Some("  "), None, None, "Unknown"), "Unknown");
/// ```
pub fn display_name(
    company_name: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
    fallback: &str,
) -> String {
    if let Some(company) = company_name.map(str::trim).filter(|c| !c.is_empty()) {
        return company.to_string();
    }

    let joined = format!(
        "{} {}",
        first_name.unwrap_or_default(),
        last_name.unwrap_or_default()
    );
    let joined = joined.trim();
    if joined.is_empty() {
        fallback.to_string()
    } else {
        joined.to_string()
    }
}

// =============================================================================
// Upsert records
// =============================================================================

/// What the upsert engine does with one incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    /// No local row yet.
    Create,
    /// Local row exists and has not been edited by a person.
    Update,
    /// Local row was edited by a person; leave it untouched.
    Skip,
}

/// State of an existing local row relevant to the upsert decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExistingRow {
    pub is_edited: bool,
}

/// Decides create, update or skip for a record given its local counterpart.
///
/// Edited rows are never written, not even their `last_synced_at`.
pub fn decide_upsert(existing: Option<ExistingRow>) -> UpsertAction {
    match existing {
        None => UpsertAction::Create,
        Some(ExistingRow { is_edited: false }) => UpsertAction::Update,
        Some(ExistingRow { is_edited: true }) => UpsertAction::Skip,
    }
}

/// One transaction's worth of records of a single kind.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityBatch {
    Users(Vec<NewUser>),
    Contacts(Vec<NewContact>),
    MatterTypes(Vec<NewMatterType>),
    MatterStatuses(Vec<NewMatterStatus>),
    Categories(Vec<NewCategory>),
    Matters(Vec<NewMatter>),
}

impl EntityBatch {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityBatch::Users(_) => EntityKind::User,
            EntityBatch::Contacts(_) => EntityKind::Contact,
            EntityBatch::MatterTypes(_) => EntityKind::MatterType,
            EntityBatch::MatterStatuses(_) => EntityKind::MatterStatus,
            EntityBatch::Categories(_) => EntityKind::Category,
            EntityBatch::Matters(_) => EntityKind::Matter,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            EntityBatch::Users(v) => v.len(),
            EntityBatch::Contacts(v) => v.len(),
            EntityBatch::MatterTypes(v) => v.len(),
            EntityBatch::MatterStatuses(v) => v.len(),
            EntityBatch::Categories(v) => v.len(),
            EntityBatch::Matters(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A record the upsert engine can batch.
pub trait SyncRecord: Clone + Send + Sync {
    const KIND: EntityKind;

    fn remote_id(&self) -> i64;

    /// Wraps a chunk of records into a store batch.
    fn into_batch(records: Vec<Self>) -> EntityBatch;
}

macro_rules! sync_record {
    ($ty:ty, $kind:ident, $variant:ident) => {
        impl SyncRecord for $ty {
            const KIND: EntityKind = EntityKind::$kind;

            fn remote_id(&self) -> i64 {
                self.remote_id
            }

            fn into_batch(records: Vec<Self>) -> EntityBatch {
                EntityBatch::$variant(records)
            }
        }
    };
}

sync_record!(NewUser, User, Users);
sync_record!(NewContact, Contact, Contacts);
sync_record!(NewMatterType, MatterType, MatterTypes);
sync_record!(NewMatterStatus, MatterStatus, MatterStatuses);
sync_record!(NewCategory, Category, Categories);
sync_record!(NewMatter, Matter, Matters);

/// Counts produced by one committed batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl BatchOutcome {
    /// Records one decision.
    pub fn record(&mut self, action: UpsertAction) {
        match action {
            UpsertAction::Create => self.created += 1,
            UpsertAction::Update => self.updated += 1,
            UpsertAction::Skip => self.skipped += 1,
        }
    }
}
