//! Garbage collection API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use debridfs_core::GcReport;

use super::handlers::error_response;
use crate::state::AppState;

/// POST /api/v1/gc
///
/// Prune empty directories now instead of waiting for the next timer tick.
pub async fn run_gc(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GcReport>, impl IntoResponse> {
    match state.gc().collect() {
        Ok(report) => Ok(Json(report)),
        Err(e) => Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e)),
    }
}
