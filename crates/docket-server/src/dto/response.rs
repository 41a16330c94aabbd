//! Response DTOs for API endpoints.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use docket_core::{Classification, Matter, MatterStats, PhaseProgress, SyncProgressView, classify};

// =============================================================================
// Health
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("healthy" or "degraded")
    pub status: String,
    /// Server version
    pub version: String,
    /// Database connectivity status
    pub database: ServiceStatus,
}

/// Status of an individual service component.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceStatus {
    /// Whether the service is reachable
    pub healthy: bool,
    /// Optional message (e.g., error details)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// =============================================================================
// Sync
// =============================================================================

/// Returned when a sync was accepted.
#[derive(Debug, Serialize, ToSchema)]
pub struct SyncStartedResponse {
    /// Identifier of the background run, for log correlation
    pub run_id: String,
    pub actor_id: i64,
    pub sync_type: String,
    /// Always "syncing"
    pub status: String,
}

/// Progress of the current phase.
#[derive(Debug, Serialize, ToSchema)]
pub struct PhaseProgressDto {
    pub processed: i64,
    pub total: i64,
    pub percentage: u8,
}

impl From<PhaseProgress> for PhaseProgressDto {
    fn from(p: PhaseProgress) -> Self {
        Self {
            processed: p.processed,
            total: p.total,
            percentage: p.percentage,
        }
    }
}

/// Polled sync status.
#[derive(Debug, Serialize, ToSchema)]
pub struct SyncStatusResponse {
    pub actor_id: i64,
    pub sync_type: String,
    /// One of idle, syncing, completed, failed
    pub status: String,
    pub syncing: bool,
    /// Inferred phase while syncing: reference, list or details
    pub phase: Option<String>,
    pub progress: Option<PhaseProgressDto>,
    pub total_processed: i64,
    pub total_failed: i64,
    pub failure_reason: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<SyncProgressView> for SyncStatusResponse {
    fn from(v: SyncProgressView) -> Self {
        Self {
            actor_id: v.actor_id,
            sync_type: v.sync_type.to_string(),
            status: v.status.to_string(),
            syncing: v.syncing,
            phase: v.phase.map(|p| p.to_string()),
            progress: v.progress.map(PhaseProgressDto::from),
            total_processed: v.total_processed,
            total_failed: v.total_failed,
            failure_reason: v.failure_reason,
            started_at: v.started_at,
            updated_at: v.updated_at,
        }
    }
}

// =============================================================================
// Matters
// =============================================================================

/// Aggregate matter counts for the dashboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatterStatsResponse {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    /// Matters with an open or answered request for evidence
    pub rfe: usize,
    pub overdue: usize,
    pub stale: usize,
    /// Matters whose status could not be classified
    pub unknown: usize,
}

impl From<MatterStats> for MatterStatsResponse {
    fn from(s: MatterStats) -> Self {
        Self {
            total: s.total,
            active: s.active,
            completed: s.completed,
            rfe: s.rfe,
            overdue: s.overdue,
            stale: s.stale,
            unknown: s.unknown,
        }
    }
}

/// Semantic flags for a status label.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClassificationDto {
    pub category: String,
    pub is_filed: bool,
    pub is_approved: bool,
    pub is_denied: bool,
    pub is_rfe: bool,
    pub is_rfe_filed: bool,
    pub is_pending: bool,
    pub is_drafting: bool,
    pub is_closed: bool,
    pub is_active: bool,
    pub is_completed: bool,
}

impl From<Classification> for ClassificationDto {
    fn from(c: Classification) -> Self {
        Self {
            category: c.category.as_str().to_string(),
            is_filed: c.is_filed,
            is_approved: c.is_approved,
            is_denied: c.is_denied,
            is_rfe: c.is_rfe,
            is_rfe_filed: c.is_rfe_filed,
            is_pending: c.is_pending,
            is_drafting: c.is_drafting,
            is_closed: c.is_closed,
            is_active: c.is_active,
            is_completed: c.is_completed,
        }
    }
}

/// A stored matter with its status classification.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatterResponse {
    pub remote_id: i64,
    pub title: String,
    pub number: Option<String>,
    pub client_name: Option<String>,
    pub assignee_name: Option<String>,
    pub matter_type_name: Option<String>,
    pub status_name: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub classification: ClassificationDto,
    pub overdue: bool,
    pub stale: bool,
    /// True when a person edited the matter locally; sync leaves it alone
    pub is_edited: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl MatterResponse {
    pub fn new(matter: Matter, stale_days: i64) -> Self {
        let label = matter.status_name.as_deref();
        Self {
            classification: classify(label).into(),
            overdue: docket_core::is_overdue(matter.deadline, label),
            stale: docket_core::is_stale(matter.remote_updated_at, stale_days),
            remote_id: matter.remote_id,
            title: matter.title,
            number: matter.number,
            client_name: matter.client_name,
            assignee_name: matter.assignee_name,
            matter_type_name: matter.matter_type_name,
            status_name: matter.status_name,
            deadline: matter.deadline,
            is_edited: matter.is_edited,
            last_synced_at: matter.last_synced_at,
        }
    }
}
