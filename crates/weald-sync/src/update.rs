//! The update channel: server-push deltas and console lines.
//!
//! The client's first frame must be `{connectionId}`, binding the socket
//! to the session established on the command channel. A missing, empty,
//! or unknown id discards the partial session and closes the socket --
//! no broadcast target is ever registered for it. After a successful
//! bind the server confirms with `down_socket_confirm` and pushes
//! `update_batch` and `{console}` frames; full resyncs never travel on
//! this channel.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use weald_types::protocol::{UpdateBind, UpdateMessage};

use crate::state::SyncState;

/// Upgrade an HTTP request to the update `WebSocket`.
///
/// # Route
///
/// `GET /update`
pub async fn update_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<SyncState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_update(socket, state))
}

/// Handle the update socket lifecycle for one client.
async fn handle_update(mut socket: WebSocket, state: Arc<SyncState>) {
    // Step 4 of the handshake: the first frame binds the session.
    let Some(bind) = await_bind(&mut socket).await else {
        debug!("update socket closed before binding");
        return;
    };

    if bind.connection_id.is_empty() {
        warn!("update socket sent an empty connection id; discarding session");
        return;
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    if let Err(e) = state.registry.bind_update(&bind.connection_id, tx).await {
        warn!(error = %e, "update channel binding rejected");
        return;
    }
    let connection_id = bind.connection_id;

    // Step 5: confirm the binding.
    let confirm = match serde_json::to_string(&UpdateMessage::DownSocketConfirm) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "failed to serialize down_socket_confirm");
            state.registry.remove(&connection_id).await;
            return;
        }
    };
    if socket.send(Message::Text(confirm.into())).await.is_err() {
        state.registry.remove(&connection_id).await;
        return;
    }
    info!(%connection_id, "update channel confirmed");

    loop {
        tokio::select! {
            // Forward frames staged by the broadcaster.
            frame = rx.recv() => {
                match frame {
                    Some(text) => {
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            debug!(%connection_id, "update socket send failed");
                            break;
                        }
                    }
                    None => {
                        debug!(%connection_id, "update channel dropped by registry");
                        break;
                    }
                }
            }
            // Watch for the client going away.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%connection_id, "update socket closed by client");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%connection_id, error = %e, "update socket error");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Clients send nothing else on this channel.
                    }
                }
            }
        }
    }

    // Either half closing destroys the pairing.
    state.registry.remove(&connection_id).await;
    info!(%connection_id, "update session discarded");
}

/// Wait for the binding frame. Returns `None` if the socket closes or
/// errors first; malformed frames are logged and skipped.
async fn await_bind(socket: &mut WebSocket) -> Option<UpdateBind> {
    loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<UpdateBind>(text.as_str()) {
                    Ok(bind) => return Some(bind),
                    Err(e) => {
                        warn!(error = %e, "malformed update-channel bootstrap message");
                    }
                }
            }
            Some(Ok(Message::Ping(data))) => {
                if socket.send(Message::Pong(data)).await.is_err() {
                    return None;
                }
            }
            Some(Ok(Message::Close(_))) | None => return None,
            Some(Ok(_)) => {}
            Some(Err(_)) => return None,
        }
    }
}
