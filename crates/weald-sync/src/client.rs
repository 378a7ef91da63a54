//! The observing client: drives the two-socket handshake and reconciles
//! pushed updates into an [`EntityCache`].
//!
//! Connection sequence (the counterpart of the server handlers in this
//! crate):
//!
//! 1. open the command socket, await `connection_confirm`;
//! 2. send `sync`, ingest the full entity snapshot;
//! 3. open the update socket, send `{connectionId}`;
//! 4. await `down_socket_confirm`;
//! 5. reconcile every pushed `update_batch` in arrival order.
//!
//! Per-frame parse failures while streaming are logged and skipped
//! without closing the socket; only transport failures end the session.

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use weald_types::ConnectionId;
use weald_types::protocol::{
    CommandReply, CommandRequest, UpdateBind, UpdateFrame, UpdateMessage,
};

use crate::cache::EntityCache;

/// A plain or TLS client WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors that end a client session.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The underlying WebSocket transport failed.
    #[error("websocket error: {0}")]
    Ws(Box<tokio_tungstenite::tungstenite::Error>),

    /// A channel closed while the handshake was still in progress.
    #[error("connection closed during handshake")]
    ClosedDuringHandshake,

    /// The server broke the handshake sequence.
    #[error("protocol violation during handshake: {0}")]
    Protocol(String),

    /// The update channel closed after a completed handshake.
    #[error("update channel closed")]
    UpdateClosed,
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Ws(Box::new(e))
    }
}

/// Something the server pushed on the update channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// An `update_batch` arrived and was reconciled into the cache.
    Batch {
        /// How many records of the batch applied cleanly.
        applied: usize,
    },
    /// A console narration line.
    Console(String),
}

/// A connected observer with a fully established session.
pub struct SyncClient {
    /// The session id assigned by the server.
    connection_id: ConnectionId,
    /// The local entity cache; never authoritative.
    cache: EntityCache,
    /// The command channel.
    command: WsStream,
    /// The update channel.
    update: WsStream,
}

impl SyncClient {
    /// Connect to a sync gateway and run the full handshake.
    ///
    /// `base_url` is the WebSocket origin, e.g. `ws://127.0.0.1:4225`;
    /// the command and update routes are derived from it.
    ///
    /// # Errors
    ///
    /// Any transport failure or handshake protocol violation.
    pub async fn connect(base_url: &str) -> Result<Self, ClientError> {
        // Command channel and connection id.
        let (mut command, _) = connect_async(format!("{base_url}/command")).await?;
        let connection_id = await_connection_confirm(&mut command).await?;
        info!(%connection_id, "command channel confirmed");

        // Full sync.
        let mut cache = EntityCache::new();
        let count = request_full_sync(&mut command, &mut cache).await?;
        info!(%connection_id, entity_count = count, "full sync ingested");

        // Update channel, bound to the same session.
        let (mut update, _) = connect_async(format!("{base_url}/update")).await?;
        let bind = UpdateBind {
            connection_id: connection_id.clone(),
        };
        let bind_json = serde_json::to_string(&bind)
            .map_err(|e| ClientError::Protocol(format!("failed to encode bind message: {e}")))?;
        update.send(Message::Text(bind_json.into())).await?;
        await_down_socket_confirm(&mut update).await?;
        info!(%connection_id, "update channel confirmed");

        Ok(Self {
            connection_id,
            cache,
            command,
            update,
        })
    }

    /// The session id assigned during the handshake.
    pub const fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    /// The local entity cache.
    pub const fn cache(&self) -> &EntityCache {
        &self.cache
    }

    /// Wait for the next pushed frame and reconcile it.
    ///
    /// # Errors
    ///
    /// [`ClientError::UpdateClosed`] when the server goes away;
    /// transport errors otherwise.
    pub async fn next_event(&mut self) -> Result<ClientEvent, ClientError> {
        loop {
            match self.update.next().await {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<UpdateFrame>(text.as_str()) {
                        Ok(UpdateFrame::Message(UpdateMessage::UpdateBatch { updates })) => {
                            let applied = self.cache.apply_batch(updates);
                            return Ok(ClientEvent::Batch { applied });
                        }
                        Ok(UpdateFrame::Message(UpdateMessage::DownSocketConfirm)) => {
                            debug!("duplicate down_socket_confirm ignored");
                        }
                        Ok(UpdateFrame::Console(console)) => {
                            return Ok(ClientEvent::Console(console.console));
                        }
                        Err(e) => {
                            // Malformed frames are skipped, never fatal.
                            warn!(error = %e, "malformed update frame, skipping");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => return Err(ClientError::UpdateClosed),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Repeat the `sync` command and replace the cache with a fresh
    /// snapshot. Returns the number of entities cached.
    ///
    /// # Errors
    ///
    /// Transport or protocol failures on the command channel.
    pub async fn resync(&mut self) -> Result<usize, ClientError> {
        request_full_sync(&mut self.command, &mut self.cache).await
    }
}

impl core::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SyncClient")
            .field("connection_id", &self.connection_id)
            .field("cached_entities", &self.cache.len())
            .finish_non_exhaustive()
    }
}

/// Await the `connection_confirm` frame on a fresh command channel.
async fn await_connection_confirm(command: &mut WsStream) -> Result<ConnectionId, ClientError> {
    match await_command_reply(command).await? {
        CommandReply::ConnectionConfirm { connection_id } => Ok(connection_id),
        other => Err(ClientError::Protocol(format!(
            "expected connection_confirm, got {other:?}"
        ))),
    }
}

/// Send a `sync` command and ingest the reply into the cache.
async fn request_full_sync(
    command: &mut WsStream,
    cache: &mut EntityCache,
) -> Result<usize, ClientError> {
    let request = CommandRequest::Sync {
        timestamp: Utc::now().timestamp_millis(),
    };
    let json = serde_json::to_string(&request)
        .map_err(|e| ClientError::Protocol(format!("failed to encode sync command: {e}")))?;
    command.send(Message::Text(json.into())).await?;

    match await_command_reply(command).await? {
        CommandReply::Sync { data } => Ok(cache.apply_full_sync(data.entities)),
        other => Err(ClientError::Protocol(format!(
            "expected sync reply, got {other:?}"
        ))),
    }
}

/// Await the `down_socket_confirm` frame on a fresh update channel.
async fn await_down_socket_confirm(update: &mut WsStream) -> Result<(), ClientError> {
    loop {
        match update.next().await {
            Some(Ok(Message::Text(text))) => {
                return match serde_json::from_str::<UpdateFrame>(text.as_str()) {
                    Ok(UpdateFrame::Message(UpdateMessage::DownSocketConfirm)) => Ok(()),
                    Ok(other) => Err(ClientError::Protocol(format!(
                        "expected down_socket_confirm, got {other:?}"
                    ))),
                    Err(e) => Err(ClientError::Protocol(format!(
                        "unparseable frame during binding: {e}"
                    ))),
                };
            }
            Some(Ok(Message::Close(_))) | None => return Err(ClientError::ClosedDuringHandshake),
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

/// Await the next structured reply on the command channel, skipping
/// non-text frames.
async fn await_command_reply(command: &mut WsStream) -> Result<CommandReply, ClientError> {
    loop {
        match command.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str::<CommandReply>(text.as_str()).map_err(|e| {
                    ClientError::Protocol(format!("unparseable command reply: {e}"))
                });
            }
            Some(Ok(Message::Close(_))) | None => return Err(ClientError::ClosedDuringHandshake),
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }
}
