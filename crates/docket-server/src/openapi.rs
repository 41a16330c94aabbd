//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::dto::{
    ClassificationDto, HealthResponse, MatterResponse, MatterStatsResponse, PhaseProgressDto,
    ServiceStatus, SyncStartedResponse, SyncStatusResponse, SyncTypeQuery,
};
use crate::error::ErrorResponse;
use crate::handlers::{health, matters, sync};

/// OpenAPI documentation for the Docket API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Docket API",
        version = "1.0.0",
        description = "Mirrors a firm's case-management data into the local dashboard database.

## Quick Start

1. Check server health: `GET /api/v1/health`
2. Start a sync: `POST /api/v1/sync/42`
3. Poll its progress: `GET /api/v1/sync/42/status`
4. Read the results: `GET /api/v1/matters/stats`
",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        health::health_check,
        sync::start_sync,
        sync::get_sync_status,
        matters::get_matter_stats,
        matters::get_matter,
    ),
    components(
        schemas(
            // Request types
            SyncTypeQuery,
            // Response types
            ErrorResponse,
            HealthResponse,
            ServiceStatus,
            SyncStartedResponse,
            SyncStatusResponse,
            PhaseProgressDto,
            MatterStatsResponse,
            MatterResponse,
            ClassificationDto,
        )
    ),
    tags(
        (name = "system", description = "System health"),
        (name = "sync", description = "Synchronization with the case-management service"),
        (name = "matters", description = "Synced matter data"),
    )
)]
pub struct ApiDoc;
