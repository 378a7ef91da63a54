//! The client-side entity cache and its reconciliation rules.
//!
//! The cache is the client's best-known copy of every entity it has been
//! sent. It is mutated only by applying full syncs and update records in
//! arrival order, and is never authoritative. Applying all deltas in
//! order converges the cache to the server's state, even when some deltas
//! are coalesced into a later full sync.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::warn;
use weald_types::protocol::{DeltaRecord, UpdateRecord};
use weald_types::{Entity, EntityId, merge_state_delta};

/// The client's local copy of server entities.
#[derive(Debug, Clone, Default)]
pub struct EntityCache {
    /// Cached entities keyed by id.
    entities: HashMap<EntityId, Entity>,
}

impl EntityCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a full sync: the snapshot replaces the entire cache.
    ///
    /// Returns the number of entities now cached.
    pub fn apply_full_sync(&mut self, entities: Vec<Entity>) -> usize {
        self.entities.clear();
        for entity in entities {
            self.entities.insert(entity.id.clone(), entity);
        }
        self.entities.len()
    }

    /// Apply one update record.
    ///
    /// A full record overwrites the cached entity wholesale. A delta
    /// record merges: existing top-level state fields are kept, `location`
    /// merges field-wise, every other delta key overwrites its field, and
    /// the cached version adopts the incoming value. Unknown ids are
    /// inserted as new entities, not merged.
    pub fn apply_record(&mut self, record: UpdateRecord) {
        match record {
            UpdateRecord::Full(entity) => {
                self.entities.insert(entity.id.clone(), entity);
            }
            UpdateRecord::Delta(delta) => self.apply_delta(delta),
        }
    }

    /// Merge a delta record into the cache.
    fn apply_delta(&mut self, record: DeltaRecord) {
        if let Some(entity) = self.entities.get_mut(&record.id) {
            merge_state_delta(&mut entity.state, &record.delta);
            entity.version = record.version;
            return;
        }

        // A delta for an id we have never seen creates the entity; its
        // type stays unknown until a full record arrives.
        let mut state = Value::Object(Map::new());
        merge_state_delta(&mut state, &record.delta);
        self.entities.insert(
            record.id.clone(),
            Entity {
                id: record.id,
                entity_type: String::new(),
                version: record.version,
                state,
            },
        );
    }

    /// Parse and apply one raw batch value. Malformed records are logged
    /// and skipped; the rest of the batch still applies.
    ///
    /// Returns whether the record applied.
    pub fn apply_raw(&mut self, id: &EntityId, value: Value) -> bool {
        match serde_json::from_value::<UpdateRecord>(value) {
            Ok(record) => {
                self.apply_record(record);
                true
            }
            Err(e) => {
                warn!(entity_id = %id, error = %e, "malformed update record, skipping");
                false
            }
        }
    }

    /// Apply every record of an `update_batch`. Returns how many applied.
    pub fn apply_batch(&mut self, updates: impl IntoIterator<Item = (EntityId, Value)>) -> usize {
        let mut applied = 0_usize;
        for (id, value) in updates {
            if self.apply_raw(&id, value) {
                applied = applied.saturating_add(1);
            }
        }
        applied
    }

    /// Look up a cached entity.
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Number of cached entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over all cached entities.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// All cached entities with the given type tag.
    pub fn of_type<'a>(&'a self, entity_type: &'a str) -> impl Iterator<Item = &'a Entity> {
        self.entities
            .values()
            .filter(move |entity| entity.entity_type == entity_type)
    }
}
