//! Seams to the external entity store and apply pipeline.
//!
//! Durable storage, version bookkeeping, and the transactional apply
//! primitive live outside this core. These traits are the only surface the
//! orchestrator and behavior engine touch; the server binary provides an
//! in-memory reference implementation, and tests use recording stubs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use weald_types::{Entity, EntityId, Operation};

/// Errors from the external entity store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("entity not found: {0}")]
    NotFound(EntityId),

    /// The store backend failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// A committed mutation, as reported by the apply pipeline.
///
/// Carries everything the sync broadcaster needs to build a delta record.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// The mutated entity.
    pub entity_id: EntityId,
    /// Type tag of the mutated entity.
    pub entity_type: String,
    /// The entity version after the commit.
    pub new_version: u64,
    /// The state delta that was applied.
    pub delta: Value,
}

/// Errors from the apply pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// The operation's expected version is stale; nothing was applied and
    /// nothing will be broadcast.
    #[error("version conflict on {entity_id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// The entity the operation targeted.
        entity_id: EntityId,
        /// The version the operation expected.
        expected: u64,
        /// The version the store actually holds.
        actual: u64,
    },

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read access to the entity store.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// All entity ids carrying the given type tag.
    async fn find_keys_by_type(&self, entity_type: &str) -> Result<Vec<EntityId>, StoreError>;

    /// Snapshot the entities with the given ids. Unknown ids are simply
    /// absent from the result, not an error.
    async fn find_by_ids(
        &self,
        ids: &[EntityId],
    ) -> Result<BTreeMap<EntityId, Entity>, StoreError>;
}

/// Property writes that bypass optimistic concurrency.
///
/// Used for behavior flags and clock bookkeeping, where last-write-wins is
/// acceptable; entity state mutations that race with agents go through the
/// [`ApplyPipeline`] instead.
#[async_trait]
pub trait EntityWriter: Send + Sync {
    /// Merge the given properties into the entity's state and return the
    /// new version.
    async fn save_properties(&self, id: &EntityId, props: Value) -> Result<u64, StoreError>;
}

/// The transactional apply primitive: commits an [`Operation`] or rejects
/// it on version mismatch.
#[async_trait]
pub trait ApplyPipeline: Send + Sync {
    /// Apply the operation. On success the entity's version has been bumped
    /// by exactly 1 and the returned [`Applied`] describes the commit.
    ///
    /// # Errors
    ///
    /// [`ApplyError::VersionConflict`] if `expected_version` is stale;
    /// [`ApplyError::Store`] for backend failures.
    async fn apply(&self, operation: Operation) -> Result<Applied, ApplyError>;
}
