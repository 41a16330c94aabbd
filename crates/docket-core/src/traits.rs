//! Trait definitions for the engine's collaborators.
//!
//! The sync engine never talks to HTTP or SQL directly. It is written against
//! four narrow interfaces:
//!
//! - [`TokenProvider`] - "give me a valid bearer credential"
//! - [`PracticeSource`] - typed, paginated reads from the remote API
//! - [`EntityStore`] - reference reads and transactional batch upserts
//! - [`SyncRegistry`] - the persisted per-actor progress record
//!
//! `docket-client` and `docket-db` provide the production implementations;
//! the integration tests use in-memory ones.
//!
//! # Example
//!
//! ```
//! use docket_core::traits::{EntityStore, SyncRegistry};
//! use docket_core::{AppError, SyncProgressView, SyncType};
//!
//! async fn poll<S, R>(store: &S, registry: &R, actor_id: i64) -> Result<SyncProgressView, AppError>
//! where
//!     S: EntityStore,
//!     R: SyncRegistry,
//! {
//!     let record = registry.get(actor_id, SyncType::Full).await?;
//!     let counts = store.entity_counts().await?;
//!     Ok(SyncProgressView::project(actor_id, SyncType::Full, record, &counts))
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use crate::job::{SyncProgress, SyncState, SyncType};
use crate::models::{BatchOutcome, EntityBatch, Matter, MatterStatusRow, NamedRef};
use crate::remote::{
    RemoteCategory, RemoteContact, RemoteMatter, RemoteMatterStatus, RemoteMatterType, RemoteUser,
};
use crate::{AppError, EntityCounts};

/// Source of bearer credentials for the remote API.
pub trait TokenProvider: Send + Sync + Clone {
    /// Returns a valid token for the actor, or `None` when the account is not
    /// connected. `None` is an expected outcome, not an error.
    fn get_token(
        &self,
        actor_id: i64,
    ) -> impl Future<Output = Result<Option<String>, AppError>> + Send;
}

/// Result of paging through one remote collection.
///
/// A page that fails with a non-success status stops the loop; whatever was
/// read before it is still returned alongside the error so callers can keep
/// the partial data and still report the failure.
#[derive(Debug)]
pub struct Collection<T> {
    pub records: Vec<T>,
    pub aborted: Option<AppError>,
}

impl<T> Collection<T> {
    /// A collection that was read to the end.
    pub fn complete(records: Vec<T>) -> Self {
        Self {
            records,
            aborted: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }
}

/// Typed read access to the remote case-management API.
///
/// Every collection method pages through the full collection under the
/// client's rate limit. Network failures are returned as `Err`; non-success
/// statuses end the collection early (see [`Collection`]).
pub trait PracticeSource: Send + Sync + Clone {
    fn list_users(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Collection<RemoteUser>, AppError>> + Send;

    fn list_contacts(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Collection<RemoteContact>, AppError>> + Send;

    fn list_matter_types(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Collection<RemoteMatterType>, AppError>> + Send;

    fn list_matter_statuses(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Collection<RemoteMatterStatus>, AppError>> + Send;

    fn list_categories(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Collection<RemoteCategory>, AppError>> + Send;

    /// Lists all matters in their shallow (list endpoint) form.
    fn list_matters(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Collection<RemoteMatter>, AppError>> + Send;

    /// Fetches one matter with its embedded references.
    ///
    /// # Arguments
    ///
    /// * `remote_id` - The matter's id on the remote service
    fn get_matter(
        &self,
        token: &str,
        remote_id: i64,
    ) -> impl Future<Output = Result<RemoteMatter, AppError>> + Send;
}

/// Local persistence for synced entities.
pub trait EntityStore: Send + Sync + Clone {
    /// Creates, updates or skips every record of the batch inside one
    /// transaction bounded by `timeout`.
    ///
    /// Rows with `is_edited = true` are left untouched. On any error the whole
    /// batch is rolled back and nothing it contained is counted.
    fn upsert_batch(
        &self,
        batch: &EntityBatch,
        timeout: Duration,
    ) -> impl Future<Output = Result<BatchOutcome, AppError>> + Send;

    /// Stored `full_name` of every user.
    fn user_names(&self) -> impl Future<Output = Result<Vec<NamedRef>, AppError>> + Send;

    /// Stored `display_name` of every contact.
    fn contact_names(&self) -> impl Future<Output = Result<Vec<NamedRef>, AppError>> + Send;

    fn matter_type_names(&self) -> impl Future<Output = Result<Vec<NamedRef>, AppError>> + Send;

    fn matter_status_names(&self)
    -> impl Future<Output = Result<Vec<NamedRef>, AppError>> + Send;

    /// Row counts per collection, used for phase inference.
    fn entity_counts(&self) -> impl Future<Output = Result<EntityCounts, AppError>> + Send;

    /// Remote ids of matters worth a detail fetch: not edited and without a
    /// resolved assignee, oldest sync first.
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of ids returned
    fn detail_candidates(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<i64>, AppError>> + Send;

    /// Status, deadline and update time of every stored matter.
    fn matter_status_rows(
        &self,
    ) -> impl Future<Output = Result<Vec<MatterStatusRow>, AppError>> + Send;

    /// Looks up a stored matter by its remote id.
    fn get_matter(
        &self,
        remote_id: i64,
    ) -> impl Future<Output = Result<Option<Matter>, AppError>> + Send;
}

/// The persisted progress record, one per (actor, sync type).
///
/// This is the only channel between a background sync and the clients that
/// poll it.
pub trait SyncRegistry: Send + Sync + Clone {
    /// Creates the record or resets it to `syncing` with zeroed counters and
    /// no failure reason.
    fn begin(
        &self,
        actor_id: i64,
        sync_type: SyncType,
    ) -> impl Future<Output = Result<SyncProgress, AppError>> + Send;

    /// Adds a phase's counts to the running totals. The status is unchanged.
    fn add_counts(
        &self,
        actor_id: i64,
        sync_type: SyncType,
        processed: u64,
        failed: u64,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Moves a `syncing` record to a terminal state.
    ///
    /// This is a compare-and-swap on the status: it returns `false` and
    /// changes nothing if the record is not currently `syncing`.
    fn finish(
        &self,
        actor_id: i64,
        sync_type: SyncType,
        state: SyncState,
        failure_reason: Option<&str>,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Reads the record, if one was ever created.
    fn get(
        &self,
        actor_id: i64,
        sync_type: SyncType,
    ) -> impl Future<Output = Result<Option<SyncProgress>, AppError>> + Send;
}

/// Tries a primary credential source, then a secondary one.
///
/// Errors from the primary source are returned as-is; only `None` falls
/// through.
#[derive(Debug, Clone)]
pub struct FallbackTokenProvider<A, B> {
    primary: A,
    secondary: B,
}

impl<A, B> FallbackTokenProvider<A, B>
where
    A: TokenProvider,
    B: TokenProvider,
{
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }
}

impl<A, B> TokenProvider for FallbackTokenProvider<A, B>
where
    A: TokenProvider,
    B: TokenProvider,
{
    async fn get_token(&self, actor_id: i64) -> Result<Option<String>, AppError> {
        match self.primary.get_token(actor_id).await? {
            Some(token) => Ok(Some(token)),
            None => self.secondary.get_token(actor_id).await,
        }
    }
}
