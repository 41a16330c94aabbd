//! Test utilities and mock implementations for integration tests.
//!
//! Provides in-memory implementations of the collaborator traits for testing
//! `UpsertEngine` and `SyncOrchestrator` in isolation.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use docket_core::models::{ExistingRow, NamedRef};
use docket_core::remote::{
    RemoteCategory, RemoteContact, RemoteMatter, RemoteMatterStatus, RemoteMatterType, RemoteUser,
};
use docket_core::traits::{Collection, EntityStore, PracticeSource, SyncRegistry, TokenProvider};
use docket_core::{
    AppError, BatchOutcome, EntityBatch, EntityCounts, EntityKind, Matter, MatterStatusRow,
    NewMatter, SyncConfig, SyncEvent, SyncProgress, SyncRecord, SyncReporter, SyncState, SyncType,
    UpsertAction, decide_upsert,
};
use tokio::sync::Semaphore;

// =============================================================================
// MockEntityStore
// =============================================================================

#[derive(Default)]
struct StoreState {
    rows: HashMap<EntityKind, HashMap<i64, EntityBatch>>,
    edited: HashSet<(EntityKind, i64)>,
    last_synced: HashMap<(EntityKind, i64), DateTime<Utc>>,
    poisoned: HashSet<i64>,
    batch_calls: usize,
}

/// In-memory entity store.
///
/// Each stored row is kept as a single-record [`EntityBatch`] so one map can
/// hold every entity kind.
#[derive(Clone, Default)]
pub struct MockEntityStore {
    state: Arc<Mutex<StoreState>>,
}

impl MockEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a row as edited by a person.
    pub fn mark_edited(&self, kind: EntityKind, remote_id: i64) {
        self.state.lock().unwrap().edited.insert((kind, remote_id));
    }

    /// Any batch containing this remote id fails like a timed-out transaction.
    pub fn poison(&self, remote_id: i64) {
        self.state.lock().unwrap().poisoned.insert(remote_id);
    }

    /// Number of `upsert_batch` calls so far.
    pub fn batch_calls(&self) -> usize {
        self.state.lock().unwrap().batch_calls
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.state
            .lock()
            .unwrap()
            .rows
            .get(&kind)
            .map_or(0, HashMap::len)
    }

    pub fn matter(&self, remote_id: i64) -> Option<NewMatter> {
        let state = self.state.lock().unwrap();
        match state.rows.get(&EntityKind::Matter)?.get(&remote_id)? {
            EntityBatch::Matters(m) => m.first().cloned(),
            _ => None,
        }
    }

    /// Seeds a matter directly, bypassing the upsert rules.
    pub fn insert_matter(&self, matter: NewMatter) {
        let mut state = self.state.lock().unwrap();
        let id = matter.remote_id;
        state
            .rows
            .entry(EntityKind::Matter)
            .or_default()
            .insert(id, EntityBatch::Matters(vec![matter]));
        state.last_synced.insert((EntityKind::Matter, id), Utc::now());
    }

    pub fn last_synced(&self, kind: EntityKind, remote_id: i64) -> Option<DateTime<Utc>> {
        self.state
            .lock()
            .unwrap()
            .last_synced
            .get(&(kind, remote_id))
            .copied()
    }

    fn records<T, F>(&self, kind: EntityKind, extract: F) -> Vec<T>
    where
        F: Fn(&EntityBatch) -> Option<T>,
    {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<(i64, T)> = state
            .rows
            .get(&kind)
            .into_iter()
            .flat_map(|m| m.iter())
            .filter_map(|(id, row)| extract(row).map(|r| (*id, r)))
            .collect();
        rows.sort_by_key(|(id, _)| *id);
        rows.into_iter().map(|(_, r)| r).collect()
    }

    fn matters(&self) -> Vec<NewMatter> {
        self.records(EntityKind::Matter, |row| match row {
            EntityBatch::Matters(m) => m.first().cloned(),
            _ => None,
        })
    }
}

fn apply_records<T: SyncRecord>(
    state: &mut StoreState,
    records: &[T],
    outcome: &mut BatchOutcome,
) {
    let now = Utc::now();
    for record in records {
        let key = (T::KIND, record.remote_id());
        let existing = state
            .rows
            .get(&T::KIND)
            .and_then(|m| m.get(&record.remote_id()))
            .map(|_| ExistingRow {
                is_edited: state.edited.contains(&key),
            });

        let action = decide_upsert(existing);
        if action != UpsertAction::Skip {
            state
                .rows
                .entry(T::KIND)
                .or_default()
                .insert(record.remote_id(), T::into_batch(vec![record.clone()]));
            state.last_synced.insert(key, now);
        }
        outcome.record(action);
    }
}

fn batch_ids(batch: &EntityBatch) -> Vec<i64> {
    match batch {
        EntityBatch::Users(v) => v.iter().map(|r| r.remote_id).collect(),
        EntityBatch::Contacts(v) => v.iter().map(|r| r.remote_id).collect(),
        EntityBatch::MatterTypes(v) => v.iter().map(|r| r.remote_id).collect(),
        EntityBatch::MatterStatuses(v) => v.iter().map(|r| r.remote_id).collect(),
        EntityBatch::Categories(v) => v.iter().map(|r| r.remote_id).collect(),
        EntityBatch::Matters(v) => v.iter().map(|r| r.remote_id).collect(),
    }
}

impl EntityStore for MockEntityStore {
    async fn upsert_batch(
        &self,
        batch: &EntityBatch,
        _timeout: Duration,
    ) -> Result<BatchOutcome, AppError> {
        let mut state = self.state.lock().unwrap();
        state.batch_calls += 1;

        if batch_ids(batch).iter().any(|id| state.poisoned.contains(id)) {
            return Err(AppError::Generic(
                "canceling statement due to statement timeout".to_string(),
            ));
        }

        let mut outcome = BatchOutcome::default();
        match batch {
            EntityBatch::Users(v) => apply_records(&mut state, v, &mut outcome),
            EntityBatch::Contacts(v) => apply_records(&mut state, v, &mut outcome),
            EntityBatch::MatterTypes(v) => apply_records(&mut state, v, &mut outcome),
            EntityBatch::MatterStatuses(v) => apply_records(&mut state, v, &mut outcome),
            EntityBatch::Categories(v) => apply_records(&mut state, v, &mut outcome),
            EntityBatch::Matters(v) => apply_records(&mut state, v, &mut outcome),
        }
        Ok(outcome)
    }

    async fn user_names(&self) -> Result<Vec<NamedRef>, AppError> {
        Ok(self.records(EntityKind::User, |row| match row {
            EntityBatch::Users(v) => v.first().map(|u| NamedRef {
                remote_id: u.remote_id,
                name: u.full_name.clone(),
            }),
            _ => None,
        }))
    }

    async fn contact_names(&self) -> Result<Vec<NamedRef>, AppError> {
        Ok(self.records(EntityKind::Contact, |row| match row {
            EntityBatch::Contacts(v) => v.first().map(|c| NamedRef {
                remote_id: c.remote_id,
                name: c.display_name.clone(),
            }),
            _ => None,
        }))
    }

    async fn matter_type_names(&self) -> Result<Vec<NamedRef>, AppError> {
        Ok(self.records(EntityKind::MatterType, |row| match row {
            EntityBatch::MatterTypes(v) => v.first().map(|t| NamedRef {
                remote_id: t.remote_id,
                name: t.name.clone(),
            }),
            _ => None,
        }))
    }

    async fn matter_status_names(&self) -> Result<Vec<NamedRef>, AppError> {
        Ok(self.records(EntityKind::MatterStatus, |row| match row {
            EntityBatch::MatterStatuses(v) => v.first().map(|s| NamedRef {
                remote_id: s.remote_id,
                name: s.name.clone(),
            }),
            _ => None,
        }))
    }

    async fn entity_counts(&self) -> Result<EntityCounts, AppError> {
        let matters = self.matters();
        Ok(EntityCounts {
            users: self.count(EntityKind::User) as i64,
            contacts: self.count(EntityKind::Contact) as i64,
            matter_types: self.count(EntityKind::MatterType) as i64,
            matter_statuses: self.count(EntityKind::MatterStatus) as i64,
            categories: self.count(EntityKind::Category) as i64,
            matters: matters.len() as i64,
            matters_with_assignee: matters.iter().filter(|m| m.assignee_name.is_some()).count()
                as i64,
        })
    }

    async fn detail_candidates(&self, limit: usize) -> Result<Vec<i64>, AppError> {
        let edited = self.state.lock().unwrap().edited.clone();
        Ok(self
            .matters()
            .into_iter()
            .filter(|m| m.assignee_name.is_none())
            .filter(|m| !edited.contains(&(EntityKind::Matter, m.remote_id)))
            .map(|m| m.remote_id)
            .take(limit)
            .collect())
    }

    async fn matter_status_rows(&self) -> Result<Vec<MatterStatusRow>, AppError> {
        Ok(self
            .matters()
            .into_iter()
            .map(|m| MatterStatusRow {
                status_name: m.status_name,
                deadline: m.deadline,
                remote_updated_at: m.remote_updated_at,
            })
            .collect())
    }

    async fn get_matter(&self, remote_id: i64) -> Result<Option<Matter>, AppError> {
        let edited = self
            .state
            .lock()
            .unwrap()
            .edited
            .contains(&(EntityKind::Matter, remote_id));
        let last_synced_at = self.last_synced(EntityKind::Matter, remote_id);
        Ok(self.matter(remote_id).map(|m| Matter {
            id: m.remote_id,
            remote_id: m.remote_id,
            title: m.title,
            number: m.number,
            description: m.description,
            client_id: m.client_id,
            client_name: m.client_name,
            assignee_id: m.assignee_id,
            assignee_name: m.assignee_name,
            matter_type_id: m.matter_type_id,
            matter_type_name: m.matter_type_name,
            status_id: m.status_id,
            status_name: m.status_name,
            opened_at: m.opened_at,
            closed_at: m.closed_at,
            deadline: m.deadline,
            remote_updated_at: m.remote_updated_at,
            is_edited: edited,
            edited_by: None,
            edited_at: None,
            last_synced_at,
        }))
    }
}

// =============================================================================
// MockSyncRegistry
// =============================================================================

/// In-memory progress records with the same compare-and-swap rule as the
/// database registry.
#[derive(Clone, Default)]
pub struct MockSyncRegistry {
    records: Arc<Mutex<HashMap<(i64, SyncType), SyncProgress>>>,
    /// Number of upcoming `finish` calls that fail with a database error.
    pub finish_failures: Arc<AtomicUsize>,
    /// Every `finish` call, successful or not.
    pub finish_calls: Arc<AtomicUsize>,
    /// Every status written, in order.
    pub transitions: Arc<Mutex<Vec<SyncState>>>,
}

impl MockSyncRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, actor_id: i64, sync_type: SyncType) -> Option<SyncProgress> {
        self.records
            .lock()
            .unwrap()
            .get(&(actor_id, sync_type))
            .cloned()
    }
}

impl SyncRegistry for MockSyncRegistry {
    async fn begin(&self, actor_id: i64, sync_type: SyncType) -> Result<SyncProgress, AppError> {
        let now = Utc::now();
        let record = SyncProgress {
            actor_id,
            sync_type,
            status: SyncState::Syncing,
            total_processed: 0,
            total_failed: 0,
            failure_reason: None,
            started_at: Some(now),
            updated_at: now,
        };
        self.records
            .lock()
            .unwrap()
            .insert((actor_id, sync_type), record.clone());
        self.transitions.lock().unwrap().push(SyncState::Syncing);
        Ok(record)
    }

    async fn add_counts(
        &self,
        actor_id: i64,
        sync_type: SyncType,
        processed: u64,
        failed: u64,
    ) -> Result<(), AppError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&(actor_id, sync_type))
            .ok_or_else(|| AppError::NotFound(format!("sync progress for actor {}", actor_id)))?;
        record.total_processed += processed as i64;
        record.total_failed += failed as i64;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn finish(
        &self,
        actor_id: i64,
        sync_type: SyncType,
        state: SyncState,
        failure_reason: Option<&str>,
    ) -> Result<bool, AppError> {
        self.finish_calls.fetch_add(1, Ordering::SeqCst);
        let pending = self.finish_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.finish_failures.store(pending - 1, Ordering::SeqCst);
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }

        let mut records = self.records.lock().unwrap();
        match records.get_mut(&(actor_id, sync_type)) {
            Some(record) if record.status == SyncState::Syncing => {
                record.status = state;
                record.failure_reason = failure_reason.map(str::to_string);
                record.updated_at = Utc::now();
                self.transitions.lock().unwrap().push(state);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get(
        &self,
        actor_id: i64,
        sync_type: SyncType,
    ) -> Result<Option<SyncProgress>, AppError> {
        Ok(self.record(actor_id, sync_type))
    }
}

// =============================================================================
// MockPracticeSource
// =============================================================================

/// Remote API stand-in with configurable data and failures.
#[derive(Clone, Default)]
pub struct MockPracticeSource {
    pub users: Vec<RemoteUser>,
    pub contacts: Vec<RemoteContact>,
    pub categories: Vec<RemoteCategory>,
    pub matter_types: Vec<RemoteMatterType>,
    pub statuses: Vec<RemoteMatterStatus>,
    pub matters: Vec<RemoteMatter>,
    /// Detail payloads keyed by matter id.
    pub details: HashMap<i64, RemoteMatter>,
    /// Collection that answers HTTP 500 on its first page.
    pub fail: Option<EntityKind>,
    /// Collection that answers HTTP 500 after returning its first record.
    pub truncate: Option<EntityKind>,
    /// Collection whose fetch panics.
    pub panic_on: Option<EntityKind>,
    /// Matter detail requests answer as if the rate limit never lifted.
    pub rate_limit_details: bool,
    /// When set, every collection call waits for a permit.
    pub gate: Option<Arc<Semaphore>>,
    /// Every call made, in order.
    pub calls: Arc<Mutex<Vec<EntityKind>>>,
}

impl MockPracticeSource {
    pub fn calls(&self) -> Vec<EntityKind> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, kind: EntityKind) -> usize {
        self.calls().iter().filter(|k| **k == kind).count()
    }

    async fn serve<T: Clone>(
        &self,
        kind: EntityKind,
        records: &[T],
    ) -> Result<Collection<T>, AppError> {
        self.calls.lock().unwrap().push(kind);

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| AppError::Generic(e.to_string()))?;
            permit.forget();
        }

        if self.panic_on == Some(kind) {
            panic!("simulated panic while fetching {}", kind);
        }

        let error = || AppError::HttpStatus {
            status: 500,
            url: format!("mock://{}", kind),
        };

        if self.fail == Some(kind) {
            return Err(error());
        }
        if self.truncate == Some(kind) {
            return Ok(Collection {
                records: records.iter().take(1).cloned().collect(),
                aborted: Some(error()),
            });
        }
        Ok(Collection::complete(records.to_vec()))
    }
}

impl PracticeSource for MockPracticeSource {
    async fn list_users(&self, _token: &str) -> Result<Collection<RemoteUser>, AppError> {
        self.serve(EntityKind::User, &self.users).await
    }

    async fn list_contacts(&self, _token: &str) -> Result<Collection<RemoteContact>, AppError> {
        self.serve(EntityKind::Contact, &self.contacts).await
    }

    async fn list_matter_types(
        &self,
        _token: &str,
    ) -> Result<Collection<RemoteMatterType>, AppError> {
        self.serve(EntityKind::MatterType, &self.matter_types).await
    }

    async fn list_matter_statuses(
        &self,
        _token: &str,
    ) -> Result<Collection<RemoteMatterStatus>, AppError> {
        self.serve(EntityKind::MatterStatus, &self.statuses).await
    }

    async fn list_categories(&self, _token: &str) -> Result<Collection<RemoteCategory>, AppError> {
        self.serve(EntityKind::Category, &self.categories).await
    }

    async fn list_matters(&self, _token: &str) -> Result<Collection<RemoteMatter>, AppError> {
        self.serve(EntityKind::Matter, &self.matters).await
    }

    async fn get_matter(&self, _token: &str, remote_id: i64) -> Result<RemoteMatter, AppError> {
        self.calls.lock().unwrap().push(EntityKind::Matter);
        if self.rate_limit_details {
            return Err(AppError::RateLimitExceeded);
        }
        self.details
            .get(&remote_id)
            .cloned()
            .ok_or_else(|| AppError::HttpStatus {
                status: 404,
                url: format!("mock://matters/{}", remote_id),
            })
    }
}

// =============================================================================
// MockTokenProvider
// =============================================================================

#[derive(Clone)]
pub struct MockTokenProvider(pub Option<String>);

impl MockTokenProvider {
    pub fn connected() -> Self {
        Self(Some("test-token".to_string()))
    }

    pub fn disconnected() -> Self {
        Self(None)
    }
}

impl TokenProvider for MockTokenProvider {
    async fn get_token(&self, _actor_id: i64) -> Result<Option<String>, AppError> {
        Ok(self.0.clone())
    }
}

// =============================================================================
// CountingReporter
// =============================================================================

/// Reporter that counts batch events.
#[derive(Default)]
pub struct CountingReporter {
    pub committed: AtomicUsize,
    pub failed: AtomicUsize,
}

impl CountingReporter {
    pub fn committed(&self) -> usize {
        self.committed.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }
}

impl SyncReporter for CountingReporter {
    fn report(&self, event: SyncEvent<'_>) {
        match event {
            SyncEvent::BatchCommitted { .. } => {
                self.committed.fetch_add(1, Ordering::SeqCst);
            }
            SyncEvent::BatchFailed { .. } => {
                self.failed.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn from_json<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
    serde_json::from_value(value).unwrap()
}

pub fn remote_user(id: i64, first: &str, last: &str) -> RemoteUser {
    from_json(serde_json::json!({
        "id": id,
        "first_name": first,
        "last_name": last,
        "email": format!("{}@firm.test", first.to_lowercase()),
    }))
}

pub fn remote_matter(id: i64, client_id: i64, assignee_id: Option<i64>, status_id: i64) -> RemoteMatter {
    from_json(serde_json::json!({
        "id": id,
        "title": format!("Matter {}", id),
        "client_id": client_id,
        "assignee_id": assignee_id,
        "matter_type_id": 1,
        "status_id": status_id,
    }))
}

/// A small firm: two attorneys, two clients, three statuses and four
/// matters, two of which lack an assignee in the list payload. Matter 4's
/// detail payload names an attorney the firm no longer lists.
pub fn firm_source() -> MockPracticeSource {
    let mut details = HashMap::new();
    details.insert(
        3,
        from_json(serde_json::json!({
            "id": 3,
            "title": "Matter 3",
            "client_id": 20,
            "assignee": {"id": 1, "first_name": "Ann", "last_name": "Lee"},
            "status_id": 101,
        })),
    );
    details.insert(
        4,
        from_json(serde_json::json!({
            "id": 4,
            "title": "Matter 4",
            "client_id": 21,
            "assignee": {"id": 9, "first_name": "Former", "last_name": "Partner"},
            "status_id": 102,
        })),
    );

    MockPracticeSource {
        users: vec![remote_user(1, "Ann", "Lee"), remote_user(2, "Raj", "Patel")],
        contacts: vec![
            from_json(serde_json::json!({"id": 20, "first_name": "Maria", "last_name": "Gomez"})),
            from_json(serde_json::json!({"id": 21, "company_name": "Chan Imports"})),
        ],
        categories: vec![from_json(serde_json::json!({"id": 5, "name": "Family"}))],
        matter_types: vec![from_json(
            serde_json::json!({"id": 1, "name": "I-130", "category_id": 5}),
        )],
        statuses: vec![
            from_json(serde_json::json!({"id": 100, "name": "Case Filed"})),
            from_json(serde_json::json!({"id": 101, "name": "RFE Received"})),
            from_json(serde_json::json!({"id": 102, "name": "Pending Interview"})),
        ],
        matters: vec![
            remote_matter(1, 20, Some(1), 100),
            remote_matter(2, 21, Some(2), 101),
            remote_matter(3, 20, None, 101),
            remote_matter(4, 21, None, 102),
        ],
        details,
        ..Default::default()
    }
}

/// Engine configuration without inter-request delays.
pub fn test_config() -> SyncConfig {
    SyncConfig::default().with_detail_delay(Duration::ZERO)
}
