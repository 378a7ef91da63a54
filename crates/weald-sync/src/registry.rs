//! Connection pairings: the unit of fan-out for broadcasts.
//!
//! A session is created when a command socket connects and becomes a
//! broadcast target only once an update socket binds to it with the same
//! connection id. Closing either half tears the whole pairing down; a
//! client that disconnects mid-handshake leaves no orphaned target.

use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};
use weald_types::ConnectionId;

use crate::error::SyncError;

/// Sender half of a session's update channel.
pub type UpdateSender = mpsc::UnboundedSender<String>;

/// One logical client session.
#[derive(Debug, Default)]
struct Session {
    /// Present once the update socket has bound; frames pushed here are
    /// forwarded to the client by the update-socket task.
    update_tx: Option<UpdateSender>,
}

/// Registry of all live command/update pairings.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// Sessions keyed by connection id.
    sessions: RwLock<HashMap<ConnectionId, Session>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session for a freshly connected command socket.
    pub async fn register(&self, connection_id: ConnectionId) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(connection_id, Session::default());
    }

    /// Bind an update channel to an existing session.
    ///
    /// # Errors
    ///
    /// [`SyncError::UnknownConnection`] if no session exists for the id,
    /// [`SyncError::AlreadyBound`] if the session already has an update
    /// channel.
    pub async fn bind_update(
        &self,
        connection_id: &ConnectionId,
        tx: UpdateSender,
    ) -> Result<(), SyncError> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(connection_id) else {
            return Err(SyncError::UnknownConnection(connection_id.clone()));
        };
        if session.update_tx.is_some() {
            return Err(SyncError::AlreadyBound(connection_id.clone()));
        }
        session.update_tx = Some(tx);
        debug!(%connection_id, "update channel bound");
        Ok(())
    }

    /// Tear down a session entirely. Safe to call twice; the second call
    /// is a no-op.
    pub async fn remove(&self, connection_id: &ConnectionId) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(connection_id).is_some() {
            debug!(%connection_id, "session removed");
        }
    }

    /// Whether a session exists for the given id (bound or not).
    pub async fn is_registered(&self, connection_id: &ConnectionId) -> bool {
        self.sessions.read().await.contains_key(connection_id)
    }

    /// Number of live sessions (including ones still mid-handshake).
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Number of fully paired sessions (broadcast targets).
    pub async fn bound_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.update_tx.is_some())
            .count()
    }

    /// Push a frame to every fully paired session's update channel.
    ///
    /// Sessions whose update task has gone away are pruned as a side
    /// effect. Returns the number of sessions the frame was delivered to.
    pub async fn broadcast(&self, frame: &str) -> usize {
        let mut dead: Vec<ConnectionId> = Vec::new();
        let mut delivered = 0_usize;

        {
            let sessions = self.sessions.read().await;
            for (connection_id, session) in sessions.iter() {
                let Some(tx) = &session.update_tx else {
                    continue;
                };
                if tx.send(frame.to_owned()).is_ok() {
                    delivered = delivered.saturating_add(1);
                } else {
                    dead.push(connection_id.clone());
                }
            }
        }

        if !dead.is_empty() {
            let mut sessions = self.sessions.write().await;
            for connection_id in dead {
                warn!(%connection_id, "pruning session with dead update channel");
                sessions.remove(&connection_id);
            }
        }

        delivered
    }
}
