//! Sync trigger and status endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::info;

use docket_core::{SyncStart, TracingSyncReporter};

use crate::dto::{SyncStartedResponse, SyncStatusResponse, SyncTypeQuery};
use crate::error::ApiError;
use crate::state::AppState;

/// Start a sync for an actor.
///
/// The sync runs in the background; this returns as soon as the progress
/// record is `syncing`. Poll GET /api/v1/sync/{actor_id}/status for progress.
#[utoipa::path(
    post,
    path = "/api/v1/sync/{actor_id}",
    params(
        ("actor_id" = i64, Path, description = "Dashboard user whose account is synced"),
        SyncTypeQuery
    ),
    responses(
        (status = 202, description = "Sync started", body = SyncStartedResponse),
        (status = 400, description = "Unknown sync type"),
        (status = 409, description = "No connected account", body = crate::error::ErrorResponse),
        (status = 503, description = "Server is shutting down"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "sync"
)]
pub async fn start_sync(
    State(state): State<AppState>,
    Path(actor_id): Path<i64>,
    Query(query): Query<SyncTypeQuery>,
) -> Result<(StatusCode, Json<SyncStartedResponse>), ApiError> {
    let sync_type = query.sync_type()?;

    if state.shutdown_token.is_cancelled() {
        return Err(ApiError::ServiceUnavailable(
            "Server is shutting down".to_string(),
        ));
    }

    match state
        .orchestrator
        .start_sync(actor_id, sync_type, TracingSyncReporter)
        .await?
    {
        SyncStart::Started(ticket) => {
            info!(actor_id, run_id = %ticket.run_id, sync_type = %sync_type, "Sync accepted");
            Ok((
                StatusCode::ACCEPTED,
                Json(SyncStartedResponse {
                    run_id: ticket.run_id.to_string(),
                    actor_id,
                    sync_type: sync_type.to_string(),
                    status: "syncing".to_string(),
                }),
            ))
        }
        SyncStart::NotConnected => Err(ApiError::NotConnected),
    }
}

/// Get the sync status of an actor.
///
/// While a run is active the current phase and its progress are inferred
/// from how much data has been stored so far.
#[utoipa::path(
    get,
    path = "/api/v1/sync/{actor_id}/status",
    params(
        ("actor_id" = i64, Path, description = "Dashboard user whose account is synced"),
        SyncTypeQuery
    ),
    responses(
        (status = 200, description = "Current sync status", body = SyncStatusResponse),
        (status = 400, description = "Unknown sync type"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "sync"
)]
pub async fn get_sync_status(
    State(state): State<AppState>,
    Path(actor_id): Path<i64>,
    Query(query): Query<SyncTypeQuery>,
) -> Result<Json<SyncStatusResponse>, ApiError> {
    let sync_type = query.sync_type()?;
    let view = state
        .orchestrator
        .get_sync_status(actor_id, sync_type)
        .await?;

    Ok(Json(view.into()))
}
