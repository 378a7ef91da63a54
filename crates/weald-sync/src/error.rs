//! Error types for the sync gateway.

use weald_core::StoreError;
use weald_types::ConnectionId;

/// Errors that can occur on the server side of the sync protocol.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// An update channel tried to bind to a connection id that was never
    /// issued (or whose session has already been torn down).
    #[error("unknown connection id: {0}")]
    UnknownConnection(ConnectionId),

    /// A session already has an update channel bound.
    #[error("update channel already bound for connection {0}")]
    AlreadyBound(ConnectionId),

    /// Reading the entity snapshot for a full sync failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
