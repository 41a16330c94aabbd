//! Sync event reporting.
//!
//! The engine emits [`SyncEvent`]s; what happens to them is up to the
//! [`SyncReporter`] the caller passes in. The server and CLI log them through
//! [`TracingSyncReporter`], tests usually use [`SilentSyncReporter`].

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::job::{SyncState, SyncType};
use crate::models::{BatchOutcome, EntityKind};
use crate::sync::{PhaseResult, SyncPhase, SyncStats};

// =============================================================================
// Sync Events
// =============================================================================

/// Events emitted during a sync run.
#[derive(Debug, Clone)]
pub enum SyncEvent<'a> {
    /// A background run began.
    RunStarted {
        run_id: Uuid,
        actor_id: i64,
        sync_type: SyncType,
    },
    /// A phase began.
    PhaseStarted { phase: SyncPhase },
    /// A collection finished loading from the remote API.
    CollectionFetched {
        kind: EntityKind,
        count: usize,
        complete: bool,
    },
    /// One batch transaction committed.
    BatchCommitted {
        kind: EntityKind,
        batch: usize,
        batches: usize,
        outcome: BatchOutcome,
        totals: &'a SyncStats,
    },
    /// One batch transaction was rolled back.
    BatchFailed {
        kind: EntityKind,
        batch: usize,
        batches: usize,
        records: usize,
        error: &'a str,
    },
    /// A phase ended, successfully or not.
    PhaseFinished { result: &'a PhaseResult },
    /// The run reached a terminal state.
    RunFinished {
        run_id: Uuid,
        actor_id: i64,
        state: SyncState,
        reason: Option<&'a str>,
    },
}

// =============================================================================
// Reporters
// =============================================================================

/// Trait for reporting sync events.
pub trait SyncReporter: Send + Sync {
    /// Called when a sync event occurs.
    ///
    /// The default implementation does nothing (silent mode).
    fn report(&self, event: SyncEvent<'_>) {
        let _ = event;
    }
}

/// Silent reporter that ignores all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSyncReporter;

impl SyncReporter for SilentSyncReporter {}

/// Tracing-based reporter for CLI/server logging.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSyncReporter;

impl SyncReporter for TracingSyncReporter {
    fn report(&self, event: SyncEvent<'_>) {
        match event {
            SyncEvent::RunStarted {
                run_id,
                actor_id,
                sync_type,
            } => {
                info!(%run_id, actor_id, sync_type = %sync_type, "Sync started");
            }
            SyncEvent::PhaseStarted { phase } => {
                info!(phase = %phase, "Phase started");
            }
            SyncEvent::CollectionFetched {
                kind,
                count,
                complete,
            } => {
                if complete {
                    info!(kind = %kind, count, "Collection fetched");
                } else {
                    warn!(kind = %kind, count, "Collection fetch stopped early");
                }
            }
            SyncEvent::BatchCommitted {
                kind,
                batch,
                batches,
                outcome,
                totals,
            } => {
                info!(
                    kind = %kind,
                    batch,
                    batches,
                    created = outcome.created,
                    updated = outcome.updated,
                    skipped = outcome.skipped,
                    total_created = totals.created,
                    total_updated = totals.updated,
                    total_skipped = totals.skipped,
                    "Batch committed"
                );
            }
            SyncEvent::BatchFailed {
                kind,
                batch,
                batches,
                records,
                error,
            } => {
                warn!(kind = %kind, batch, batches, records, %error, "Batch rolled back");
            }
            SyncEvent::PhaseFinished { result } => {
                if result.success {
                    info!(
                        phase = %result.phase,
                        fetched = result.stats.fetched,
                        created = result.stats.created,
                        updated = result.stats.updated,
                        skipped = result.stats.skipped,
                        failed = result.stats.failed,
                        "Phase completed"
                    );
                } else {
                    warn!(
                        phase = %result.phase,
                        fatal = result.phase.is_fatal(),
                        error = %result.message,
                        "Phase failed"
                    );
                }
            }
            SyncEvent::RunFinished {
                run_id,
                actor_id,
                state,
                reason,
            } => match reason {
                Some(reason) if state == SyncState::Failed => {
                    error!(%run_id, actor_id, status = %state, reason, "Sync failed");
                }
                _ => {
                    info!(%run_id, actor_id, status = %state, "Sync finished");
                }
            },
        }
    }
}

impl<R: SyncReporter + ?Sized> SyncReporter for &R {
    fn report(&self, event: SyncEvent<'_>) {
        (**self).report(event)
    }
}

impl<R: SyncReporter + ?Sized> SyncReporter for std::sync::Arc<R> {
    fn report(&self, event: SyncEvent<'_>) {
        (**self).report(event)
    }
}
