//! The in-memory authoritative entity store and reference apply pipeline.
//!
//! In production the store and its version bookkeeping live behind a
//! durable backend; this reference implementation keeps everything in
//! memory but honors the same contract: `apply` commits a delta and bumps
//! the entity version by exactly 1, or rejects the operation on version
//! mismatch. Committed deltas are logged for the sync batcher to drain
//! once per frame -- a rejected operation leaves no trace there, so stale
//! mutations are never broadcast.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use weald_core::{Applied, ApplyError, ApplyPipeline, EntityWriter, StateStore, StoreError};
use weald_sync::SnapshotSource;
use weald_types::{Entity, EntityId, GameClock, Operation, merge_state_delta};

/// In-memory entity table with optimistic-concurrency apply.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// All entities, keyed by id.
    entities: RwLock<BTreeMap<EntityId, Entity>>,
    /// Deltas committed since the last drain, in commit order.
    applied_log: Mutex<Vec<Applied>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created entity and return its id.
    pub async fn create(&self, entity: Entity) -> EntityId {
        let id = entity.id.clone();
        let mut entities = self.entities.write().await;
        entities.insert(id.clone(), entity);
        id
    }

    /// Snapshot one entity.
    pub async fn get(&self, id: &EntityId) -> Option<Entity> {
        self.entities.read().await.get(id).cloned()
    }

    /// Total number of entities.
    pub async fn entity_count(&self) -> usize {
        self.entities.read().await.len()
    }

    /// Drain the deltas committed since the last drain, in commit order.
    pub async fn drain_applied(&self) -> Vec<Applied> {
        let mut log = self.applied_log.lock().await;
        std::mem::take(&mut *log)
    }

    /// Find the game clock singleton.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no clock entity exists, or a backend
    /// error if its state is malformed.
    pub async fn game_clock(&self) -> Result<(EntityId, GameClock), StoreError> {
        let entities = self.entities.read().await;
        let clock_entity = entities
            .values()
            .find(|e| e.entity_type == GameClock::ENTITY_TYPE)
            .ok_or_else(|| StoreError::NotFound(EntityId::from_raw(GameClock::ENTITY_TYPE)))?;
        let clock = GameClock::from_entity(clock_entity)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok((clock_entity.id.clone(), clock))
    }

    /// Record a committed delta for the batcher.
    async fn log_applied(&self, applied: Applied) {
        let mut log = self.applied_log.lock().await;
        log.push(applied);
    }

    /// Merge a delta into an entity and bump its version by exactly 1.
    ///
    /// Shared by `save_properties` (no version check) and `apply`
    /// (version check done by the caller).
    fn commit(entity: &mut Entity, delta: &serde_json::Value) -> Result<u64, StoreError> {
        merge_state_delta(&mut entity.state, delta);
        entity.version = entity
            .version
            .checked_add(1)
            .ok_or_else(|| StoreError::Backend(String::from("entity version overflow")))?;
        Ok(entity.version)
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn find_keys_by_type(&self, entity_type: &str) -> Result<Vec<EntityId>, StoreError> {
        let entities = self.entities.read().await;
        Ok(entities
            .values()
            .filter(|e| e.entity_type == entity_type)
            .map(|e| e.id.clone())
            .collect())
    }

    async fn find_by_ids(
        &self,
        ids: &[EntityId],
    ) -> Result<BTreeMap<EntityId, Entity>, StoreError> {
        let entities = self.entities.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| entities.get(id).map(|e| (id.clone(), e.clone())))
            .collect())
    }
}

#[async_trait]
impl EntityWriter for MemoryStore {
    async fn save_properties(
        &self,
        id: &EntityId,
        props: serde_json::Value,
    ) -> Result<u64, StoreError> {
        let applied = {
            let mut entities = self.entities.write().await;
            let entity = entities
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            let new_version = Self::commit(entity, &props)?;
            Applied {
                entity_id: id.clone(),
                entity_type: entity.entity_type.clone(),
                new_version,
                delta: props,
            }
        };
        let new_version = applied.new_version;
        self.log_applied(applied).await;
        Ok(new_version)
    }
}

#[async_trait]
impl ApplyPipeline for MemoryStore {
    async fn apply(&self, operation: Operation) -> Result<Applied, ApplyError> {
        let applied = {
            let mut entities = self.entities.write().await;
            let entity = entities
                .get_mut(&operation.entity_id)
                .ok_or_else(|| StoreError::NotFound(operation.entity_id.clone()))?;

            if entity.version != operation.expected_version {
                return Err(ApplyError::VersionConflict {
                    entity_id: operation.entity_id,
                    expected: operation.expected_version,
                    actual: entity.version,
                });
            }

            let new_version = Self::commit(entity, &operation.delta).map_err(ApplyError::Store)?;
            debug!(
                entity_id = %operation.entity_id,
                new_version,
                "operation applied"
            );
            Applied {
                entity_id: operation.entity_id,
                entity_type: entity.entity_type.clone(),
                new_version,
                delta: operation.delta,
            }
        };
        self.log_applied(applied.clone()).await;
        Ok(applied)
    }
}

#[async_trait]
impl SnapshotSource for MemoryStore {
    async fn visible_entities(&self) -> Result<Vec<Entity>, StoreError> {
        let entities = self.entities.read().await;
        Ok(entities.values().cloned().collect())
    }
}
