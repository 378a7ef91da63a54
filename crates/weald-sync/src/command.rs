//! The command channel: client requests, server replies.
//!
//! On connect the server assigns a connection id and sends
//! `connection_confirm`; thereafter the client may send `sync` commands
//! and receives full entity snapshots in reply. Malformed inbound frames
//! are logged per-message and never close the socket. Closing the socket
//! tears down the whole session.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::{debug, info, warn};
use weald_types::ConnectionId;
use weald_types::protocol::{CommandReply, CommandRequest, SyncData};

use crate::state::SyncState;

/// Upgrade an HTTP request to the command `WebSocket`.
///
/// # Route
///
/// `GET /command`
pub async fn command_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<SyncState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_command(socket, state))
}

/// Handle the command socket lifecycle for one client.
async fn handle_command(mut socket: WebSocket, state: Arc<SyncState>) {
    let connection_id = ConnectionId::new();
    state.registry.register(connection_id.clone()).await;
    info!(%connection_id, "command socket connected");

    // Step 1 of the handshake: hand the client its connection id.
    let confirm = CommandReply::ConnectionConfirm {
        connection_id: connection_id.clone(),
    };
    if send_reply(&mut socket, &confirm).await {
        listen(&mut socket, &state, &connection_id).await;
    }

    // Either half closing destroys the pairing.
    state.registry.remove(&connection_id).await;
    info!(%connection_id, "command session discarded");
}

/// Serve commands until the socket closes or errors.
async fn listen(socket: &mut WebSocket, state: &Arc<SyncState>, connection_id: &ConnectionId) {
    loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<CommandRequest>(text.as_str()) {
                    Ok(CommandRequest::Sync { timestamp }) => {
                        debug!(%connection_id, timestamp, "sync command received");
                        if !serve_full_sync(socket, state, connection_id).await {
                            return;
                        }
                    }
                    Err(e) => {
                        // Malformed frames are a client problem, not a
                        // session problem; log and keep listening.
                        warn!(%connection_id, error = %e, "malformed command message");
                    }
                }
            }
            Some(Ok(Message::Ping(data))) => {
                if socket.send(Message::Pong(data)).await.is_err() {
                    return;
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                debug!(%connection_id, "command socket closed by client");
                return;
            }
            Some(Ok(_)) => {
                // Ignore binary and pong frames.
            }
            Some(Err(e)) => {
                debug!(%connection_id, error = %e, "command socket error");
                return;
            }
        }
    }
}

/// Reply to a `sync` command with the full visible entity list.
///
/// A store failure is logged and the socket stays open. Returns `false`
/// only when the socket itself is gone.
async fn serve_full_sync(
    socket: &mut WebSocket,
    state: &Arc<SyncState>,
    connection_id: &ConnectionId,
) -> bool {
    match state.source.visible_entities().await {
        Ok(entities) => {
            let count = entities.len();
            let reply = CommandReply::Sync {
                data: SyncData { entities },
            };
            let sent = send_reply(socket, &reply).await;
            if sent {
                info!(%connection_id, entity_count = count, "full sync served");
            }
            sent
        }
        Err(e) => {
            warn!(%connection_id, error = %e, "full sync snapshot failed");
            true
        }
    }
}

/// Serialize and send a command reply. Returns `false` when the socket is
/// gone.
async fn send_reply(socket: &mut WebSocket, reply: &CommandReply) -> bool {
    let json = match serde_json::to_string(reply) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "failed to serialize command reply");
            return true;
        }
    };
    if socket.send(Message::Text(json.into())).await.is_err() {
        debug!("command socket send failed, client disconnected");
        return false;
    }
    true
}
