//! Multi-phase sync orchestration.
//!
//! # Architecture
//!
//! The [`SyncOrchestrator`] is generic over the four collaborator traits:
//! - [`EntityStore`] - local rows
//! - [`SyncRegistry`] - the progress record
//! - [`PracticeSource`] - the remote API
//! - [`TokenProvider`] - bearer credentials
//!
//! A run walks the phases of its [`SyncType`] strictly in order:
//!
//! ```text
//! reference ──fail──► run failed
//!     │
//!    list ──fail──► recorded, continue
//!     │
//!  details ──fail──► recorded, run ends
//!     │
//! run completed
//! ```
//!
//! # Background Execution
//!
//! [`SyncOrchestrator::start_sync`] sets the progress record to `syncing`,
//! spawns the run on the Tokio runtime and returns immediately. The spawned
//! task is supervised: errors and panics escaping the phases are caught and
//! written to the progress record as `failed` with a reason. Polling clients
//! only ever learn the outcome through [`SyncOrchestrator::get_sync_status`].
//!
//! Nothing prevents two runs for the same actor from overlapping; the second
//! `start_sync` simply resets the record to `syncing`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::job::{EntityCounts, SyncProgressView, SyncState, SyncType};
use crate::models::{
    EntityKind, NewCategory, NewContact, NewMatterStatus, NewMatterType, NewUser, SyncRecord,
};
use crate::progress::{SyncEvent, SyncReporter};
use crate::reference::ReferenceMaps;
use crate::sync::{PhaseResult, SyncPhase, SyncStats};
use crate::traits::{Collection, EntityStore, PracticeSource, SyncRegistry, TokenProvider};
use crate::upsert::UpsertEngine;
use crate::AppError;

/// Attempts at writing the terminal status before the record is left as is.
const FINISH_ATTEMPTS: u32 = 3;
/// Pause before the second attempt; doubles after that.
const FINISH_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Immediate answer to a start request.
#[derive(Debug)]
pub enum SyncStart {
    /// The run was accepted and is executing in the background.
    Started(SyncTicket),
    /// No credential is available; nothing was started or recorded.
    NotConnected,
}

/// Handle on a background run.
///
/// Dropping the ticket detaches the run; it keeps going and still records
/// its outcome.
#[derive(Debug)]
pub struct SyncTicket {
    pub run_id: Uuid,
    handle: JoinHandle<SyncReport>,
}

impl SyncTicket {
    /// Waits for the run to reach a terminal state.
    pub async fn wait(self) -> Result<SyncReport, AppError> {
        self.handle
            .await
            .map_err(|e| AppError::Generic(format!("Sync task did not complete: {}", e)))
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub actor_id: i64,
    pub sync_type: SyncType,
    pub state: SyncState,
    pub phases: Vec<PhaseResult>,
    pub failure_reason: Option<String>,
}

impl SyncReport {
    /// True only when the run completed and every phase succeeded.
    pub fn success(&self) -> bool {
        self.state == SyncState::Completed && self.phases.iter().all(|p| p.success)
    }

    /// Sum of all phase counters.
    pub fn totals(&self) -> SyncStats {
        let mut totals = SyncStats::new();
        for phase in &self.phases {
            totals.merge(&phase.stats);
        }
        totals
    }
}

/// Runs syncs against the remote API and answers status polls.
///
/// # Example
///
/// ```ignore
/// use docket_core::{SyncOrchestrator, SyncStart, SyncType, TracingSyncReporter};
///
/// let orchestrator = SyncOrchestrator::new(store, registry, client, tokens, SyncConfig::default());
///
/// match orchestrator.start_sync(42, SyncType::Full, TracingSyncReporter).await? {
///     SyncStart::Started(ticket) => println!("run {} started", ticket.run_id),
///     SyncStart::NotConnected => println!("connect the account first"),
/// }
/// ```
pub struct SyncOrchestrator<S, G, P, T>
where
    S: EntityStore,
    G: SyncRegistry,
    P: PracticeSource,
    T: TokenProvider,
{
    store: S,
    registry: G,
    source: P,
    tokens: T,
    config: SyncConfig,
}

impl<S, G, P, T> Clone for SyncOrchestrator<S, G, P, T>
where
    S: EntityStore,
    G: SyncRegistry,
    P: PracticeSource,
    T: TokenProvider,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            registry: self.registry.clone(),
            source: self.source.clone(),
            tokens: self.tokens.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, G, P, T> SyncOrchestrator<S, G, P, T>
where
    S: EntityStore + 'static,
    G: SyncRegistry + 'static,
    P: PracticeSource + 'static,
    T: TokenProvider + 'static,
{
    pub fn new(store: S, registry: G, source: P, tokens: T, config: SyncConfig) -> Self {
        Self {
            store,
            registry,
            source,
            tokens,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Starts a background run for the actor.
    ///
    /// Returns [`SyncStart::NotConnected`] without touching the progress
    /// record when no credential is available. Otherwise the record is set to
    /// `syncing` before this returns, so an immediate poll already sees the
    /// run. Only failures to read the credential or write the record are
    /// returned as errors; everything after that is reported through the
    /// record.
    pub async fn start_sync<R>(
        &self,
        actor_id: i64,
        sync_type: SyncType,
        reporter: R,
    ) -> Result<SyncStart, AppError>
    where
        R: SyncReporter + 'static,
    {
        if self.tokens.get_token(actor_id).await?.is_none() {
            info!(actor_id, "Sync requested without a connected account");
            return Ok(SyncStart::NotConnected);
        }

        self.registry.begin(actor_id, sync_type).await?;

        let run_id = Uuid::new_v4();
        let this = self.clone();
        let handle = tokio::spawn(async move {
            this.supervise(run_id, actor_id, sync_type, reporter).await
        });

        Ok(SyncStart::Started(SyncTicket { run_id, handle }))
    }

    /// Read-only projection of the actor's progress record.
    pub async fn get_sync_status(
        &self,
        actor_id: i64,
        sync_type: SyncType,
    ) -> Result<SyncProgressView, AppError> {
        let record = self.registry.get(actor_id, sync_type).await?;
        let counts = match &record {
            Some(r) if r.status == SyncState::Syncing => self.store.entity_counts().await?,
            _ => EntityCounts::default(),
        };
        Ok(SyncProgressView::project(actor_id, sync_type, record, &counts))
    }

    // ===== Supervision =====

    async fn supervise<R: SyncReporter>(
        self,
        run_id: Uuid,
        actor_id: i64,
        sync_type: SyncType,
        reporter: R,
    ) -> SyncReport {
        reporter.report(SyncEvent::RunStarted {
            run_id,
            actor_id,
            sync_type,
        });

        let mut phases = Vec::new();
        let outcome = AssertUnwindSafe(self.run_phases(actor_id, sync_type, &reporter, &mut phases))
            .catch_unwind()
            .await;

        let (state, failure_reason) = match outcome {
            Ok(Ok(())) => (SyncState::Completed, None),
            Ok(Err(e)) => (SyncState::Failed, Some(e.to_string())),
            Err(panic) => (
                SyncState::Failed,
                Some(format!("Sync task panicked: {}", panic_message(panic.as_ref()))),
            ),
        };

        self.record_outcome(run_id, actor_id, sync_type, state, failure_reason.as_deref())
            .await;

        reporter.report(SyncEvent::RunFinished {
            run_id,
            actor_id,
            state,
            reason: failure_reason.as_deref(),
        });

        SyncReport {
            run_id,
            actor_id,
            sync_type,
            state,
            phases,
            failure_reason,
        }
    }

    /// Writes the terminal status, retrying store errors a few times so a
    /// transient outage does not leave the record `syncing`.
    async fn record_outcome(
        &self,
        run_id: Uuid,
        actor_id: i64,
        sync_type: SyncType,
        state: SyncState,
        failure_reason: Option<&str>,
    ) {
        let mut delay = FINISH_RETRY_DELAY;
        for attempt in 1..=FINISH_ATTEMPTS {
            match self
                .registry
                .finish(actor_id, sync_type, state, failure_reason)
                .await
            {
                Ok(true) => return,
                Ok(false) => {
                    warn!(%run_id, actor_id, status = %state, "Progress record was not syncing; outcome not recorded");
                    return;
                }
                Err(e) if attempt < FINISH_ATTEMPTS => {
                    warn!(%run_id, actor_id, attempt, error = %e, "Failed to record sync outcome, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    error!(%run_id, actor_id, attempts = attempt, error = %e, "Failed to record sync outcome");
                }
            }
        }
    }

    async fn run_phases<R: SyncReporter>(
        &self,
        actor_id: i64,
        sync_type: SyncType,
        reporter: &R,
        phases: &mut Vec<PhaseResult>,
    ) -> Result<(), AppError> {
        for &phase in sync_type.phases() {
            reporter.report(SyncEvent::PhaseStarted { phase });

            let mut stats = SyncStats::new();
            let outcome = match phase {
                SyncPhase::Reference => self.sync_reference(actor_id, reporter, &mut stats).await,
                SyncPhase::List => self.sync_matter_list(actor_id, reporter, &mut stats).await,
                SyncPhase::Details => self.sync_matter_details(actor_id, reporter, &mut stats).await,
            };
            let result = match outcome {
                Ok(()) => PhaseResult::succeeded(phase, stats),
                Err(e) => PhaseResult::failed(phase, stats, e.to_string()),
            };

            self.registry
                .add_counts(
                    actor_id,
                    sync_type,
                    result.stats.processed() as u64,
                    result.stats.failed as u64,
                )
                .await?;
            reporter.report(SyncEvent::PhaseFinished { result: &result });

            let abort = phase.is_fatal() && !result.success;
            let reason = result.message.clone();
            phases.push(result);

            if abort {
                return Err(AppError::SyncAborted {
                    phase: phase.to_string(),
                    reason,
                });
            }
        }
        Ok(())
    }

    // ===== Phases =====

    async fn sync_reference<R: SyncReporter>(
        &self,
        actor_id: i64,
        reporter: &R,
        stats: &mut SyncStats,
    ) -> Result<(), AppError> {
        let token = self.token(actor_id).await?;
        let engine = UpsertEngine::new(&self.store, &self.config, reporter);

        let users = self.source.list_users(&token).await?;
        self.apply_collection(&engine, users, NewUser::from, reporter, stats)
            .await?;

        let contacts = self.source.list_contacts(&token).await?;
        self.apply_collection(&engine, contacts, NewContact::from, reporter, stats)
            .await?;

        let categories = self.source.list_categories(&token).await?;
        self.apply_collection(&engine, categories, NewCategory::from, reporter, stats)
            .await?;

        let matter_types = self.source.list_matter_types(&token).await?;
        self.apply_collection(&engine, matter_types, NewMatterType::from, reporter, stats)
            .await?;

        let statuses = self.source.list_matter_statuses(&token).await?;
        self.apply_collection(&engine, statuses, NewMatterStatus::from, reporter, stats)
            .await
    }

    async fn sync_matter_list<R: SyncReporter>(
        &self,
        actor_id: i64,
        reporter: &R,
        stats: &mut SyncStats,
    ) -> Result<(), AppError> {
        let token = self.token(actor_id).await?;
        let maps = ReferenceMaps::load(&self.store).await?;
        let engine = UpsertEngine::new(&self.store, &self.config, reporter);

        let matters = self.source.list_matters(&token).await?;
        self.apply_collection(
            &engine,
            matters,
            |m| maps.matter_from_remote(m),
            reporter,
            stats,
        )
        .await
    }

    async fn sync_matter_details<R: SyncReporter>(
        &self,
        actor_id: i64,
        reporter: &R,
        stats: &mut SyncStats,
    ) -> Result<(), AppError> {
        let token = self.token(actor_id).await?;
        let maps = ReferenceMaps::load(&self.store).await?;
        let candidates = self
            .store
            .detail_candidates(self.config.detail_limit)
            .await?;

        let mut matters = Vec::with_capacity(candidates.len());
        let mut first_error: Option<AppError> = None;

        for (index, &remote_id) in candidates.iter().enumerate() {
            if index > 0 && !self.config.detail_delay.is_zero() {
                tokio::time::sleep(self.config.detail_delay).await;
            }

            match self.source.get_matter(&token, remote_id).await {
                Ok(matter) => matters.push(maps.matter_from_remote(matter)),
                Err(e) => {
                    stats.failed += 1;
                    warn!(remote_id, error = %e, "Matter detail fetch failed");
                    let stop = ends_detail_fetching(&e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                    if stop {
                        break;
                    }
                }
            }
        }

        reporter.report(SyncEvent::CollectionFetched {
            kind: EntityKind::Matter,
            count: matters.len(),
            complete: first_error.is_none(),
        });

        let engine = UpsertEngine::new(&self.store, &self.config, reporter);
        stats.merge(&engine.apply_batch(matters).await);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ===== Helpers =====

    async fn token(&self, actor_id: i64) -> Result<String, AppError> {
        self.tokens
            .get_token(actor_id)
            .await?
            .ok_or(AppError::NotConnected)
    }

    /// Converts and stores whatever a collection yielded, then surfaces an
    /// early stop as the phase error.
    async fn apply_collection<Remote, Local, F, R>(
        &self,
        engine: &UpsertEngine<'_, S, R>,
        collection: Collection<Remote>,
        convert: F,
        reporter: &R,
        stats: &mut SyncStats,
    ) -> Result<(), AppError>
    where
        Local: SyncRecord,
        F: Fn(Remote) -> Local,
        R: SyncReporter,
    {
        let Collection { records, aborted } = collection;
        reporter.report(SyncEvent::CollectionFetched {
            kind: Local::KIND,
            count: records.len(),
            complete: aborted.is_none(),
        });

        let records: Vec<Local> = records.into_iter().map(convert).collect();
        stats.merge(&engine.apply_batch(records).await);

        match aborted {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Errors after which further detail requests in the same run are pointless.
fn ends_detail_fetching(error: &AppError) -> bool {
    match error {
        AppError::HttpStatus { status, .. } => matches!(status, 401 | 403),
        AppError::RateLimitExceeded | AppError::NotConnected => true,
        _ => false,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
