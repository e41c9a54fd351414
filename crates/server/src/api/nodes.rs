//! Node API handlers.
//!
//! Entry point for the filesystem protocol server: stat a tree node and get a
//! fresh download URL for it.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use debridfs_core::{FileStat, NodeId, StreamError, StreamUrl};

use super::handlers::{error_response, ErrorResponse};
use crate::state::AppState;

fn stream_error(e: StreamError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &e {
        StreamError::NodeNotFound(_) => StatusCode::NOT_FOUND,
        StreamError::Origin(_) => StatusCode::BAD_GATEWAY,
        StreamError::Tree(_) | StreamError::Index(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, e)
}

fn not_remote(id: NodeId) -> (StatusCode, Json<ErrorResponse>) {
    error_response(
        StatusCode::NOT_FOUND,
        format!("Node {} is not backed by remote content", id),
    )
}

/// GET /api/v1/nodes/{id}/stat
///
/// Size and content type of a remotely backed file.
pub async fn stat_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<NodeId>,
) -> Result<Json<FileStat>, impl IntoResponse> {
    match state.resolver().stat(id) {
        Ok(Some(stat)) => Ok(Json(stat)),
        Ok(None) => Err(not_remote(id)),
        Err(e) => Err(stream_error(e)),
    }
}

/// GET /api/v1/nodes/{id}/stream
///
/// Exchange the node's stored link for a short-lived download URL.
pub async fn stream_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<NodeId>,
) -> Result<Json<StreamUrl>, impl IntoResponse> {
    match state.resolver().stream_url(id).await {
        Ok(Some(url)) => Ok(Json(url)),
        Ok(None) => Err(not_remote(id)),
        Err(e) => Err(stream_error(e)),
    }
}
