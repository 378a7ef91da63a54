//! Shared state for the sync gateway.

use std::sync::Arc;

use async_trait::async_trait;
use weald_core::StoreError;
use weald_types::Entity;

use crate::registry::SessionRegistry;

/// Source of the full entity snapshot served on a `sync` command.
///
/// The authoritative store implements this; it is the only read the
/// command channel performs.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Every entity currently visible to clients.
    async fn visible_entities(&self) -> Result<Vec<Entity>, StoreError>;
}

/// Shared state injected into the command and update socket handlers.
#[derive(Clone)]
pub struct SyncState {
    /// Live connection pairings.
    pub registry: Arc<SessionRegistry>,
    /// Snapshot source for full syncs.
    pub source: Arc<dyn SnapshotSource>,
}

impl SyncState {
    /// Create gateway state over a snapshot source.
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            source,
        }
    }
}
