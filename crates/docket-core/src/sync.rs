//! Sync phases and their statistics.
//!
//! Pure bookkeeping types shared by the upsert engine, the orchestrator and
//! the reporters. Nothing here performs I/O.

use serde::{Deserialize, Serialize};

use crate::models::BatchOutcome;

/// One ordered step of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Users, contacts, matter types, statuses and categories.
    Reference,
    /// All matters, shallow.
    List,
    /// Per-matter deep fetch for matters missing an assignee.
    Details,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Reference => "reference",
            SyncPhase::List => "list",
            SyncPhase::Details => "details",
        }
    }

    /// True when a failure of this phase ends the run as `failed`.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncPhase::Reference)
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters for one phase or one collection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Records read from the remote API.
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Records lost to a rolled-back batch or a failed fetch.
    pub failed: usize,
}

impl SyncStats {
    /// Creates a new empty stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the counts of one committed batch.
    pub fn record_batch(&mut self, outcome: BatchOutcome) {
        self.created += outcome.created;
        self.updated += outcome.updated;
        self.skipped += outcome.skipped;
    }

    /// Adds another tracker's counts to this one.
    pub fn merge(&mut self, other: &SyncStats) {
        self.fetched += other.fetched;
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    /// Records that were committed, whether written or skipped.
    pub fn processed(&self) -> usize {
        self.created + self.updated + self.skipped
    }
}

/// Outcome of one phase. Kept in memory for the run's report; only the
/// counters reach the progress record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase: SyncPhase,
    pub success: bool,
    pub stats: SyncStats,
    /// Summary on success, captured error on failure.
    pub message: String,
}

impl PhaseResult {
    pub fn succeeded(phase: SyncPhase, stats: SyncStats) -> Self {
        let message = format!(
            "{} records fetched ({} created, {} updated, {} skipped, {} failed)",
            stats.fetched, stats.created, stats.updated, stats.skipped, stats.failed
        );
        Self {
            phase,
            success: true,
            stats,
            message,
        }
    }

    pub fn failed(phase: SyncPhase, stats: SyncStats, error: impl Into<String>) -> Self {
        Self {
            phase,
            success: false,
            stats,
            message: error.into(),
        }
    }
}
