//! Error types for the clan behavior engine.

use weald_core::{QueueError, StoreError};
use weald_types::{EntityId, ProjectionError};

/// Errors that can occur while a clan decides or acts.
///
/// A failing agent degrades to "this clan did nothing this turn"; the
/// phase action logs the error and continues with the other clans.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The clan entity's state did not project into a [`ClanView`].
    ///
    /// [`ClanView`]: crate::clan::ClanView
    #[error("clan {entity_id} has malformed state: {source}")]
    Projection {
        /// The offending entity.
        entity_id: EntityId,
        /// The underlying projection error.
        source: ProjectionError,
    },

    /// Writing the chosen behavior back to the store failed.
    #[error("failed to save behavior for clan {entity_id}: {source}")]
    SaveBehavior {
        /// The clan being updated.
        entity_id: EntityId,
        /// The underlying store error.
        source: StoreError,
    },

    /// The operation queue's apply pipeline failed outright. A stale
    /// version rejection is not an error and never surfaces here.
    #[error("failed to queue movement for clan {entity_id}: {source}")]
    QueueMovement {
        /// The clan whose movement was being queued.
        entity_id: EntityId,
        /// The underlying queue error.
        source: QueueError,
    },
}
