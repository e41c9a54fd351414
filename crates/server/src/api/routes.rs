use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{gc, handlers, middleware::metrics_middleware, nodes, sync};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Nodes (stream resolution)
        .route("/nodes/{id}/stat", get(nodes::stat_node))
        .route("/nodes/{id}/stream", get(nodes::stream_node))
        // Reconciliation
        .route("/sync", post(sync::trigger_sync))
        .route("/sync/status", get(sync::sync_status))
        // Garbage collection
        .route("/gc", post(gc::run_gc));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
