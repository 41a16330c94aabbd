//! Sync progress record and its polling projection.
//!
//! One progress record exists per (actor, sync type). It is created on the
//! first attempt, updated in place and never deleted:
//!
//! ```text
//! idle → syncing → completed
//!           ↓
//!         failed
//! ```
//!
//! A new attempt moves any state back to `syncing`. Only a `syncing` record
//! can move to a terminal state (see [`crate::traits::SyncRegistry::finish`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sync::SyncPhase;

// =============================================================================
// Sync State
// =============================================================================

/// Status of a progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// Never started.
    #[default]
    Idle,
    /// A background run is in flight.
    Syncing,
    /// The last run finished. Individual non-fatal phases may have failed.
    Completed,
    /// The last run was aborted.
    Failed,
}

impl SyncState {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::Syncing => "syncing",
            SyncState::Completed => "completed",
            SyncState::Failed => "failed",
        }
    }

    /// Returns true if the run has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncState::Completed | SyncState::Failed)
    }
}

/// Error type for parsing SyncState from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSyncStateError(String);

impl std::fmt::Display for ParseSyncStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid sync status: {}", self.0)
    }
}

impl std::error::Error for ParseSyncStateError {}

impl std::str::FromStr for SyncState {
    type Err = ParseSyncStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(SyncState::Idle),
            "syncing" => Ok(SyncState::Syncing),
            "completed" => Ok(SyncState::Completed),
            "failed" => Ok(SyncState::Failed),
            _ => Err(ParseSyncStateError(s.to_string())),
        }
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Sync Type
// =============================================================================

/// Which phases a run covers. Each type has its own progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncType {
    /// Reference data, matter list and matter details.
    #[default]
    Full,
    /// Reference data only.
    Reference,
    /// Matter list and details against already-synced reference data.
    Matters,
}

impl SyncType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncType::Full => "full",
            SyncType::Reference => "reference",
            SyncType::Matters => "matters",
        }
    }

    /// Phases run for this type, in order.
    pub fn phases(&self) -> &'static [SyncPhase] {
        match self {
            SyncType::Full => &[SyncPhase::Reference, SyncPhase::List, SyncPhase::Details],
            SyncType::Reference => &[SyncPhase::Reference],
            SyncType::Matters => &[SyncPhase::List, SyncPhase::Details],
        }
    }
}

/// Error type for parsing SyncType from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSyncTypeError(String);

impl std::fmt::Display for ParseSyncTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid sync type: {}", self.0)
    }
}

impl std::error::Error for ParseSyncTypeError {}

impl std::str::FromStr for SyncType {
    type Err = ParseSyncTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(SyncType::Full),
            "reference" => Ok(SyncType::Reference),
            "matters" => Ok(SyncType::Matters),
            _ => Err(ParseSyncTypeError(s.to_string())),
        }
    }
}

impl std::fmt::Display for SyncType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Progress Record
// =============================================================================

/// The persisted progress record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub actor_id: i64,
    pub sync_type: SyncType,
    pub status: SyncState,
    pub total_processed: i64,
    pub total_failed: i64,
    pub failure_reason: Option<String>,
    /// When the current (or last) run was started.
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Row counts of the local store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub users: i64,
    pub contacts: i64,
    pub matter_types: i64,
    pub matter_statuses: i64,
    pub categories: i64,
    pub matters: i64,
    /// Matters whose assignee name is resolved.
    pub matters_with_assignee: i64,
}

/// Progress within the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseProgress {
    pub processed: i64,
    pub total: i64,
    /// Whole percent, 0..=100.
    pub percentage: u8,
}

impl PhaseProgress {
    pub fn new(processed: i64, total: i64) -> Self {
        let percentage = if total <= 0 {
            0
        } else {
            ((processed.clamp(0, total) * 100) / total) as u8
        };
        Self {
            processed,
            total,
            percentage,
        }
    }
}

/// Guesses the running phase from what the store already holds.
///
/// Reference data is missing → reference phase; no matters yet → list phase;
/// otherwise details, with the share of matters that have an assignee as
/// progress. This is an approximation: a re-sync over a populated store
/// reports the details phase from the start.
pub fn infer_phase(counts: &EntityCounts) -> (SyncPhase, Option<PhaseProgress>) {
    if counts.users == 0 || counts.matter_statuses == 0 {
        (SyncPhase::Reference, None)
    } else if counts.matters == 0 {
        (SyncPhase::List, None)
    } else {
        (
            SyncPhase::Details,
            Some(PhaseProgress::new(counts.matters_with_assignee, counts.matters)),
        )
    }
}

/// What a polling client sees.
///
/// `status` is always the persisted status; the phase and progress fields are
/// only filled in while the run is `syncing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncProgressView {
    pub actor_id: i64,
    pub sync_type: SyncType,
    pub status: SyncState,
    pub syncing: bool,
    pub phase: Option<SyncPhase>,
    pub progress: Option<PhaseProgress>,
    pub total_processed: i64,
    pub total_failed: i64,
    pub failure_reason: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SyncProgressView {
    /// Projects a progress record (or its absence) for polling.
    pub fn project(
        actor_id: i64,
        sync_type: SyncType,
        record: Option<SyncProgress>,
        counts: &EntityCounts,
    ) -> Self {
        let Some(record) = record else {
            return Self {
                actor_id,
                sync_type,
                status: SyncState::Idle,
                syncing: false,
                phase: None,
                progress: None,
                total_processed: 0,
                total_failed: 0,
                failure_reason: None,
                started_at: None,
                updated_at: None,
            };
        };

        let syncing = record.status == SyncState::Syncing;
        let (phase, progress) = if syncing {
            let (phase, progress) = infer_phase(counts);
            (Some(phase), progress)
        } else {
            (None, None)
        };

        Self {
            actor_id: record.actor_id,
            sync_type: record.sync_type,
            status: record.status,
            syncing,
            phase,
            progress,
            total_processed: record.total_processed,
            total_failed: record.total_failed,
            failure_reason: record.failure_reason,
            started_at: record.started_at,
            updated_at: Some(record.updated_at),
        }
    }
}
