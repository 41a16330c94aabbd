//! Request DTOs for API endpoints.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use docket_core::SyncType;

use crate::error::ApiError;

/// Query parameters selecting which sync a request refers to.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct SyncTypeQuery {
    /// Sync type: full, reference or matters (default: full)
    #[param(example = "full")]
    pub sync_type: Option<String>,
}

impl SyncTypeQuery {
    /// Parses the requested type, defaulting to a full sync.
    pub fn sync_type(&self) -> Result<SyncType, ApiError> {
        match self.sync_type.as_deref() {
            None | Some("") => Ok(SyncType::Full),
            Some(raw) => raw
                .parse::<SyncType>()
                .map_err(|e| ApiError::BadRequest(e.to_string())),
        }
    }
}
