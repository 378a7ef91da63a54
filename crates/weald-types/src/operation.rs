//! Proposed entity mutations awaiting optimistic-concurrency application.
//!
//! An [`Operation`] is a value object: built once by an agent, consumed
//! exactly once by the apply pipeline, which either commits it (bumping the
//! entity version by 1) or rejects it on version mismatch. A rejected
//! operation is dropped; the agent re-observes current state next turn.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::ids::EntityId;

/// The kind of change an operation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationAction {
    /// Merge the operation's delta into the entity state.
    Mutate,
}

/// A proposed, not-yet-applied entity mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// The entity the mutation targets.
    pub entity_id: EntityId,

    /// The entity version the proposer observed. The apply pipeline
    /// rejects the operation if the stored version has moved past this.
    pub expected_version: u64,

    /// Type tag of the target entity.
    pub entity_type: String,

    /// The kind of change requested.
    pub action: OperationAction,

    /// Partial state change describing only the changed fields.
    pub delta: Value,
}

impl Operation {
    /// Build a mutate operation against a known entity version.
    pub fn mutate(
        entity_id: EntityId,
        expected_version: u64,
        entity_type: impl Into<String>,
        delta: Value,
    ) -> Self {
        Self {
            entity_id,
            expected_version,
            entity_type: entity_type.into(),
            action: OperationAction::Mutate,
            delta,
        }
    }
}
