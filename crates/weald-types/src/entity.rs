//! The entity record, its typed projections, and the shared delta-merge rule.
//!
//! Entities are one concrete record with a type tag and an open JSON state
//! mapping; there is no inheritance tree. Code that needs structured access
//! projects an [`Entity`] into a typed view (for example [`GameClock`]) and
//! writes back plain JSON deltas.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::enums::TurnPhase;
use crate::ids::EntityId;

/// Errors produced when projecting an [`Entity`] into a typed view.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    /// The entity's type tag does not match the projection.
    #[error("expected entity type {expected}, found {actual}")]
    WrongType {
        /// The type the projection requires.
        expected: &'static str,
        /// The type tag the entity actually carries.
        actual: String,
    },

    /// The entity state is missing or malformed for this projection.
    #[error("malformed {entity_type} state: {reason}")]
    MalformedState {
        /// The entity type being projected.
        entity_type: &'static str,
        /// What was wrong with the state.
        reason: String,
    },
}

/// An integer grid coordinate pair.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct Vector2 {
    /// Column coordinate.
    pub x: i32,
    /// Row coordinate.
    pub y: i32,
}

impl Vector2 {
    /// Create a coordinate pair.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl core::fmt::Display for Vector2 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A versioned, identified record of world state.
///
/// Identity is `_id`; `type` is immutable after creation; `version`
/// increases monotonically by exactly 1 per committed mutation. The store
/// owns entities; everything else reads snapshots and submits deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Entity {
    /// Storage identity.
    #[serde(rename = "_id")]
    pub id: EntityId,

    /// Type tag used for variant dispatch (`"Clan"`, `"MapHex"`, ...).
    #[serde(rename = "type")]
    pub entity_type: String,

    /// Monotonic mutation counter.
    #[serde(default)]
    pub version: u64,

    /// Open state mapping; shape depends on `entity_type`.
    #[serde(default = "empty_state")]
    pub state: Value,
}

/// An empty JSON object, the default entity state.
fn empty_state() -> Value {
    Value::Object(Map::new())
}

impl Entity {
    /// Create a fresh entity at version 0 with a generated id.
    pub fn new(entity_type: impl Into<String>, state: Value) -> Self {
        Self {
            id: EntityId::new(),
            entity_type: entity_type.into(),
            version: 0,
            state,
        }
    }

    /// Look up a top-level state field.
    pub fn state_field(&self, key: &str) -> Option<&Value> {
        self.state.as_object().and_then(|map| map.get(key))
    }
}

/// Key-wise delta merge shared by the server store and the client cache.
///
/// For every key in `delta`: `location` shallow-merges its fields into the
/// existing location object (a partial coordinate update preserves the
/// untouched axis); every other key overwrites the corresponding top-level
/// state field. Non-object deltas are ignored.
pub fn merge_state_delta(state: &mut Value, delta: &Value) {
    let Some(delta_map) = delta.as_object() else {
        return;
    };

    if !state.is_object() {
        *state = empty_state();
    }
    let Some(state_map) = state.as_object_mut() else {
        return;
    };

    for (key, incoming) in delta_map {
        if key == "location" {
            if let Some(incoming_fields) = incoming.as_object() {
                if let Some(existing) = state_map.get_mut("location").and_then(Value::as_object_mut)
                {
                    for (field, value) in incoming_fields {
                        existing.insert(field.clone(), value.clone());
                    }
                    continue;
                }
            }
        }
        state_map.insert(key.clone(), incoming.clone());
    }
}

/// Typed projection of the singleton game clock entity.
///
/// Exactly one entity of type `"GameClock"` exists for the whole world.
/// It is mutated only by the turn orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct GameClock {
    /// The current turn number.
    pub current_turn: u64,
    /// The phase the orchestrator is currently in.
    pub turn_phase: TurnPhase,
    /// Whether a turn cycle is mid-processing.
    pub turn_processing: bool,
}

impl GameClock {
    /// The entity type tag of the game clock singleton.
    pub const ENTITY_TYPE: &'static str = "GameClock";

    /// Project a stored entity into a clock view.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if the entity is not a game clock or
    /// its state does not parse.
    pub fn from_entity(entity: &Entity) -> Result<Self, ProjectionError> {
        if entity.entity_type != Self::ENTITY_TYPE {
            return Err(ProjectionError::WrongType {
                expected: Self::ENTITY_TYPE,
                actual: entity.entity_type.clone(),
            });
        }
        serde_json::from_value(entity.state.clone()).map_err(|e| {
            ProjectionError::MalformedState {
                entity_type: Self::ENTITY_TYPE,
                reason: e.to_string(),
            }
        })
    }

    /// Render the clock as entity state JSON.
    pub fn to_state(self) -> Value {
        serde_json::json!({
            "currentTurn": self.current_turn,
            "turnPhase": self.turn_phase,
            "turnProcessing": self.turn_processing,
        })
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self {
            current_turn: 0,
            turn_phase: TurnPhase::Act,
            turn_processing: false,
        }
    }
}
