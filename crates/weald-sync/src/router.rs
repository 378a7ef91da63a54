//! Axum router construction for the sync gateway routes.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use crate::command::command_ws;
use crate::state::SyncState;
use crate::update::update_ws;

/// Build the router carrying the two sync protocol routes.
///
/// - `GET /command` -- command `WebSocket` (requests and replies)
/// - `GET /update` -- update `WebSocket` (server-push deltas)
///
/// The returned router is fully stated and can be merged into a larger
/// application router.
pub fn build_sync_router(state: Arc<SyncState>) -> Router {
    Router::new()
        .route("/command", get(command_ws))
        .route("/update", get(update_ws))
        .with_state(state)
}
