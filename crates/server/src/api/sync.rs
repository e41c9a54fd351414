//! Reconciliation API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use debridfs_core::{IndexStats, ReconcilerStatus, SyncReport, TriggerSource};
use serde::Serialize;

use super::handlers::error_response;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    #[serde(flatten)]
    pub reconciler: ReconcilerStatus,
    pub index: IndexStats,
}

/// POST /api/v1/sync
///
/// Run a reconciliation pass and return its report. Answers 409 if a pass
/// is already running.
pub async fn trigger_sync(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SyncReport>), impl IntoResponse> {
    match state.reconciler().trigger(TriggerSource::Manual).await {
        Some(report) => Ok((StatusCode::ACCEPTED, Json(report))),
        None => Err(error_response(
            StatusCode::CONFLICT,
            "A reconciliation pass is already running",
        )),
    }
}

/// GET /api/v1/sync/status
pub async fn sync_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SyncStatusResponse>, impl IntoResponse> {
    let reconciler = state.reconciler().status().await;

    match state.index().stats() {
        Ok(index) => Ok(Json(SyncStatusResponse { reconciler, index })),
        Err(e) => Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e)),
    }
}
