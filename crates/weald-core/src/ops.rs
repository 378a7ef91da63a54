//! The operation queue client: the producer side of the apply pipeline.
//!
//! Agents hand proposed mutations here; the queue submits them to the
//! external [`ApplyPipeline`] and keeps per-turn counters so the RESOLVE
//! phase can log a settlement summary. A stale-version rejection is logged
//! and dropped -- the agent re-observes current state next turn rather
//! than re-deciding within the same tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};
use weald_types::Operation;

use crate::store::{Applied, ApplyError, ApplyPipeline, StoreError};

/// Errors from queueing an operation.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The apply pipeline itself failed (not a version conflict).
    #[error("apply pipeline failure: {0}")]
    Pipeline(#[from] StoreError),
}

/// What became of a queued operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueOutcome {
    /// The operation committed; the entity is now at `new_version`.
    Applied {
        /// Version after the commit.
        new_version: u64,
    },
    /// The operation carried a stale expected version and was rejected.
    /// Nothing was applied and nothing will be broadcast.
    RejectedStale,
}

/// Counters drained by the RESOLVE phase once per turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Operations handed to the pipeline.
    pub submitted: u64,
    /// Operations that committed.
    pub applied: u64,
    /// Operations rejected on version conflict.
    pub rejected: u64,
}

/// Thin producer client in front of the external apply pipeline.
pub struct OperationQueue {
    /// The external transactional apply primitive.
    pipeline: Arc<dyn ApplyPipeline>,
    /// Operations submitted since the last drain.
    submitted: AtomicU64,
    /// Operations committed since the last drain.
    applied: AtomicU64,
    /// Operations rejected since the last drain.
    rejected: AtomicU64,
}

impl OperationQueue {
    /// Create a queue client in front of the given pipeline.
    pub fn new(pipeline: Arc<dyn ApplyPipeline>) -> Self {
        Self {
            pipeline,
            submitted: AtomicU64::new(0),
            applied: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Submit a proposed mutation to the apply pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Pipeline`] only for backend failures; a
    /// version conflict is a normal [`QueueOutcome::RejectedStale`].
    pub async fn queue(&self, operation: Operation) -> Result<QueueOutcome, QueueError> {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        debug!(
            entity_id = %operation.entity_id,
            expected_version = operation.expected_version,
            "queueing operation"
        );

        match self.pipeline.apply(operation).await {
            Ok(Applied { new_version, .. }) => {
                self.applied.fetch_add(1, Ordering::Relaxed);
                Ok(QueueOutcome::Applied { new_version })
            }
            Err(ApplyError::VersionConflict {
                entity_id,
                expected,
                actual,
            }) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(
                    %entity_id,
                    expected,
                    actual,
                    "stale operation rejected; agent will re-decide next turn"
                );
                Ok(QueueOutcome::RejectedStale)
            }
            Err(ApplyError::Store(e)) => Err(QueueError::Pipeline(e)),
        }
    }

    /// Drain and reset the per-turn counters.
    pub fn drain_stats(&self) -> QueueStats {
        QueueStats {
            submitted: self.submitted.swap(0, Ordering::Relaxed),
            applied: self.applied.swap(0, Ordering::Relaxed),
            rejected: self.rejected.swap(0, Ordering::Relaxed),
        }
    }
}

impl core::fmt::Debug for OperationQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OperationQueue")
            .field("submitted", &self.submitted)
            .field("applied", &self.applied)
            .field("rejected", &self.rejected)
            .finish_non_exhaustive()
    }
}
