//! Bulk import API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use questlog_core::{ImportError, ImportReport, ImportRequest};

use super::handlers::ErrorResponse;
use crate::state::AppState;

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportGamesRequest {
    /// Missing is treated like empty and rejected below.
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub platform_id: Option<String>,
}

impl From<ImportGamesRequest> for ImportRequest {
    fn from(body: ImportGamesRequest) -> Self {
        Self {
            raw_names: body.names,
            target_platform_id: body.platform_id,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/users/{user_id}/imports
///
/// Reconcile a list of game names for a user. Per-name failures come back
/// in `needsReview`; only an empty list is rejected.
pub async fn import_games(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(body): Json<ImportGamesRequest>,
) -> Result<Json<ImportReport>, (StatusCode, Json<ErrorResponse>)> {
    let request = ImportRequest::from(body);

    match state.reconciler().reconcile(&user_id, &request).await {
        Ok(report) => Ok(Json(report)),
        Err(e @ ImportError::EmptyRequest) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}
