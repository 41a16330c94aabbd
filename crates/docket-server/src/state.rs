use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use docket_client::{PracticeClient, StaticTokenProvider};
use docket_core::{FallbackTokenProvider, SyncConfig, SyncOrchestrator};
use docket_db::{CredentialRepository, EntityRepository, SyncProgressRepository};

/// Credential lookup: the configured token first, then stored credentials.
pub type ServerTokens = FallbackTokenProvider<StaticTokenProvider, CredentialRepository>;

/// The orchestrator wired to its production collaborators.
pub type ServerOrchestrator =
    SyncOrchestrator<EntityRepository, SyncProgressRepository, PracticeClient, ServerTokens>;

/// Shared application state for all handlers.
///
/// Axum clones the state per request; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: ServerOrchestrator,

    /// Entity repository for matter reads
    pub entity_repo: EntityRepository,

    /// Pool used for health checks
    pub pool: PgPool,

    /// Cancellation token for graceful shutdown
    pub shutdown_token: CancellationToken,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        client: PracticeClient,
        static_tokens: StaticTokenProvider,
        sync_config: SyncConfig,
        shutdown_token: CancellationToken,
    ) -> Self {
        let entity_repo = EntityRepository::new(pool.clone());
        let tokens = FallbackTokenProvider::new(static_tokens, CredentialRepository::new(pool.clone()));
        let orchestrator = SyncOrchestrator::new(
            entity_repo.clone(),
            SyncProgressRepository::new(pool.clone()),
            client,
            tokens,
            sync_config,
        );

        Self {
            orchestrator,
            entity_repo,
            pool,
            shutdown_token,
        }
    }

    pub fn stale_days(&self) -> i64 {
        self.orchestrator.config().stale_days
    }
}
