//! Wire messages for the dual-channel sync protocol.
//!
//! A client session spans two WebSocket connections:
//!
//! - the **command** channel (client requests, server replies), and
//! - the **update** channel (server-push deltas and console lines),
//!   bound to the command channel by a `{connectionId}` bootstrap message.
//!
//! Handshake: the server confirms the command connection with
//! `connection_confirm`; the client sends `sync` and receives the full
//! entity list; the client then opens the update connection, sends the
//! `connectionId`, and receives `down_socket_confirm` followed by a stream
//! of `update_batch` frames.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::entity::Entity;
use crate::ids::{ConnectionId, EntityId};

/// Client-to-server frames on the command channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommandRequest {
    /// Request a full snapshot of all visible entities.
    Sync {
        /// Client wall-clock milliseconds, for logging only.
        timestamp: i64,
    },
}

/// Server-to-client frames on the command channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandReply {
    /// First frame after the command socket opens; carries the id the
    /// client must echo on the update channel to bind the pairing.
    ConnectionConfirm {
        /// The id of this logical session.
        #[serde(rename = "connectionId")]
        connection_id: ConnectionId,
    },
    /// Full-sync response to a `sync` command.
    Sync {
        /// The snapshot payload.
        data: SyncData,
    },
}

/// Payload of a full-sync reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SyncData {
    /// Every entity currently visible to the client.
    pub entities: Vec<Entity>,
}

/// The first client-to-server frame on the update channel, binding it to
/// the session established on the command channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UpdateBind {
    /// The id received in `connection_confirm`.
    #[serde(rename = "connectionId")]
    pub connection_id: ConnectionId,
}

/// Structured server-to-client frames on the update channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateMessage {
    /// Acknowledges a successful update-channel binding.
    DownSocketConfirm,
    /// A batch of entity updates, keyed by entity id. Each value is either
    /// a full entity replacement or a delta record; see [`UpdateRecord`].
    UpdateBatch {
        /// Entity id to update record.
        updates: BTreeMap<EntityId, Value>,
    },
}

/// Informational console line pushed on the update channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ConsoleMessage {
    /// Human-readable text; purely informational.
    pub console: String,
}

/// Any frame a client can receive on the update channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpdateFrame {
    /// A structured protocol message.
    Message(UpdateMessage),
    /// A console line.
    Console(ConsoleMessage),
}

/// Marker for delta records; the only recognized operation is `"update"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum DeltaOp {
    /// Merge the delta into the cached entity.
    #[serde(rename = "update")]
    Update,
}

/// A partial update to one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DeltaRecord {
    /// The entity the delta applies to.
    #[serde(rename = "_id")]
    pub id: EntityId,

    /// The entity version after this delta was committed server-side.
    pub version: u64,

    /// Always `"update"`; anything else is not a delta record.
    pub operation: DeltaOp,

    /// Changed state fields only.
    pub delta: Value,
}

/// One record in an `update_batch`: a delta or a full replacement.
///
/// A record that carries `operation == "update"` and a `delta` is merged;
/// anything else is treated as a wholesale entity replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpdateRecord {
    /// Partial update; merged field-wise into the cached entity.
    Delta(DeltaRecord),
    /// Full replacement; overwrites the cached entity.
    Full(Entity),
}
