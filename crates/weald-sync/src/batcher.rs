//! Per-frame delta batching and fan-out.
//!
//! The apply pipeline stages every committed delta here; once per frame
//! the scheduler flushes the pending set as a single `update_batch` frame
//! to every fully paired session. Two deltas for the same entity within a
//! frame coalesce with the same field-wise merge rule the client uses, so
//! a coalesced batch and the individual deltas reconcile identically.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use weald_core::Applied;
use weald_types::protocol::{ConsoleMessage, UpdateMessage};
use weald_types::{EntityId, merge_state_delta};

use crate::registry::SessionRegistry;

/// A delta waiting for the next flush.
#[derive(Debug, Clone)]
struct PendingRecord {
    /// Entity version after the newest coalesced commit.
    version: u64,
    /// Merged delta fields.
    delta: Value,
}

/// Stages applied deltas and broadcasts them to paired sessions.
pub struct UpdateBatcher {
    /// Fan-out targets.
    registry: Arc<SessionRegistry>,
    /// Deltas staged since the last flush, keyed by entity id.
    pending: Mutex<BTreeMap<EntityId, PendingRecord>>,
}

impl UpdateBatcher {
    /// Create a batcher that fans out through the given registry.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    /// Stage a committed delta for the next flush.
    ///
    /// Deltas for the same entity coalesce field-wise; the staged version
    /// is the newest of the coalesced commits.
    pub async fn stage(&self, applied: &Applied) {
        let mut pending = self.pending.lock().await;
        match pending.entry(applied.entity_id.clone()) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                merge_state_delta(&mut record.delta, &applied.delta);
                record.version = record.version.max(applied.new_version);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(PendingRecord {
                    version: applied.new_version,
                    delta: applied.delta.clone(),
                });
            }
        }
    }

    /// Number of deltas currently staged.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Broadcast everything staged since the last flush as one
    /// `update_batch`. Returns the number of sessions reached; an empty
    /// pending set broadcasts nothing.
    pub async fn flush(&self) -> usize {
        let pending = {
            let mut guard = self.pending.lock().await;
            std::mem::take(&mut *guard)
        };
        if pending.is_empty() {
            return 0;
        }

        let update_count = pending.len();
        let updates: BTreeMap<EntityId, Value> = pending
            .into_iter()
            .map(|(id, record)| {
                let value = json!({
                    "_id": id,
                    "version": record.version,
                    "operation": "update",
                    "delta": record.delta,
                });
                (id, value)
            })
            .collect();

        let frame = UpdateMessage::UpdateBatch { updates };
        let Ok(text) = serde_json::to_string(&frame) else {
            warn!("failed to serialize update batch");
            return 0;
        };

        let delivered = self.registry.broadcast(&text).await;
        debug!(update_count, delivered, "update batch flushed");
        delivered
    }

    /// Broadcast a console line immediately (not batched).
    pub async fn console(&self, message: &str) -> usize {
        let frame = ConsoleMessage {
            console: message.to_owned(),
        };
        let Ok(text) = serde_json::to_string(&frame) else {
            warn!("failed to serialize console message");
            return 0;
        };
        self.registry.broadcast(&text).await
    }
}

impl core::fmt::Debug for UpdateBatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UpdateBatcher").finish_non_exhaustive()
    }
}
