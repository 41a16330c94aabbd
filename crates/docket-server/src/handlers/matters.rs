//! Matter read endpoints.

use axum::{
    Json,
    extract::{Path, State},
};

use docket_core::{EntityStore, MatterStats};

use crate::dto::{MatterResponse, MatterStatsResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Get aggregate matter statistics.
#[utoipa::path(
    get,
    path = "/api/v1/matters/stats",
    responses(
        (status = 200, description = "Matter statistics", body = MatterStatsResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "matters"
)]
pub async fn get_matter_stats(
    State(state): State<AppState>,
) -> Result<Json<MatterStatsResponse>, ApiError> {
    let rows = state.entity_repo.matter_status_rows().await?;
    let stats = MatterStats::from_rows(&rows, state.stale_days());

    Ok(Json(stats.into()))
}

/// Get a stored matter by its remote id.
#[utoipa::path(
    get,
    path = "/api/v1/matters/{remote_id}",
    params(
        ("remote_id" = i64, Path, description = "Matter id on the case-management service")
    ),
    responses(
        (status = 200, description = "Matter found", body = MatterResponse),
        (status = 404, description = "Matter not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "matters"
)]
pub async fn get_matter(
    State(state): State<AppState>,
    Path(remote_id): Path<i64>,
) -> Result<Json<MatterResponse>, ApiError> {
    let matter = state
        .entity_repo
        .get_matter(remote_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Matter not found: {}", remote_id)))?;

    Ok(Json(MatterResponse::new(matter, state.stale_days())))
}
