//! Axum router assembly for the world server.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use weald_sync::build_sync_router;

use crate::handlers::{self, AppState};

/// Build the complete application router.
///
/// The sync gateway routes (`/command`, `/update`) are merged with the
/// REST surface. CORS allows any origin for development dashboards.
pub fn build_router(app_state: AppState) -> Router {
    let sync_state = Arc::clone(&app_state.sync);

    let rest = Router::new()
        .route("/", get(handlers::index))
        .route("/api/status", get(handlers::get_status))
        .route("/api/pause", post(handlers::post_pause))
        .route("/api/resume", post(handlers::post_resume))
        .with_state(app_state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    rest.merge(build_sync_router(sync_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
