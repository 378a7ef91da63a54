//! Typed projection of clan entities.
//!
//! Clans are stored as plain entities with a `"Clan"` type tag and an open
//! state mapping. The behavior engine works against this read-only view,
//! which captures the entity version at projection time for optimistic
//! concurrency.

use serde::Deserialize;
use weald_types::{Behavior, CultureGroup, Entity, EntityId, ProjectionError, Vector2};

use crate::error::AgentError;

/// The entity type tag of clan entities.
pub const CLAN_TYPE: &str = "Clan";

/// The portion of a clan entity's state the behavior engine reads.
#[derive(Debug, Clone, Deserialize)]
struct ClanState {
    /// Display name of the clan.
    #[serde(default)]
    name: String,
    /// Head count.
    #[serde(default)]
    population: u32,
    /// Culture group membership.
    #[serde(default)]
    culture: CultureGroup,
    /// Where the clan currently sits on the map.
    #[serde(default)]
    location: Vector2,
    /// The behavior chosen during ACT.
    #[serde(default)]
    behavior: Behavior,
}

/// A read-only snapshot of one clan, as of a known entity version.
#[derive(Debug, Clone)]
pub struct ClanView {
    /// The clan's entity id.
    pub id: EntityId,
    /// The entity version this view was taken at. Movement operations
    /// carry this as their expected version.
    pub version: u64,
    /// Display name.
    pub name: String,
    /// Head count.
    pub population: u32,
    /// Culture group membership.
    pub culture: CultureGroup,
    /// Current map position.
    pub location: Vector2,
    /// Behavior chosen during ACT.
    pub behavior: Behavior,
}

impl ClanView {
    /// Project a stored entity into a clan view.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Projection`] if the entity is not a clan or
    /// its state does not parse.
    pub fn from_entity(entity: &Entity) -> Result<Self, AgentError> {
        if entity.entity_type != CLAN_TYPE {
            return Err(AgentError::Projection {
                entity_id: entity.id.clone(),
                source: ProjectionError::WrongType {
                    expected: CLAN_TYPE,
                    actual: entity.entity_type.clone(),
                },
            });
        }

        let state: ClanState =
            serde_json::from_value(entity.state.clone()).map_err(|e| AgentError::Projection {
                entity_id: entity.id.clone(),
                source: ProjectionError::MalformedState {
                    entity_type: CLAN_TYPE,
                    reason: e.to_string(),
                },
            })?;

        Ok(Self {
            id: entity.id.clone(),
            version: entity.version,
            name: state.name,
            population: state.population,
            culture: state.culture,
            location: state.location,
            behavior: state.behavior,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn projects_full_state() {
        let entity = Entity {
            id: EntityId::from_raw("clan-1"),
            entity_type: String::from(CLAN_TYPE),
            version: 9,
            state: json!({
                "name": "Aelfen",
                "population": 42,
                "culture": "RIVERINE",
                "location": {"x": 3, "y": 4},
                "behavior": "WANDERING"
            }),
        };

        let view = ClanView::from_entity(&entity).unwrap();
        assert_eq!(view.version, 9);
        assert_eq!(view.name, "Aelfen");
        assert_eq!(view.culture, CultureGroup::Riverine);
        assert_eq!(view.location, Vector2::new(3, 4));
        assert_eq!(view.behavior, Behavior::Wandering);
    }

    #[test]
    fn missing_fields_default() {
        let entity = Entity {
            id: EntityId::from_raw("clan-2"),
            entity_type: String::from(CLAN_TYPE),
            version: 0,
            state: json!({"name": "Brydd"}),
        };

        let view = ClanView::from_entity(&entity).unwrap();
        assert_eq!(view.behavior, Behavior::None);
        assert_eq!(view.location, Vector2::new(0, 0));
        assert_eq!(view.culture, CultureGroup::Unassigned);
    }

    #[test]
    fn rejects_non_clan_entities() {
        let entity = Entity::new("MapHex", json!({}));
        let result = ClanView::from_entity(&entity);
        assert!(matches!(result, Err(AgentError::Projection { .. })));
    }

    #[test]
    fn rejects_malformed_state() {
        let entity = Entity {
            id: EntityId::from_raw("clan-3"),
            entity_type: String::from(CLAN_TYPE),
            version: 0,
            state: json!({"location": "nowhere"}),
        };
        let result = ClanView::from_entity(&entity);
        assert!(matches!(result, Err(AgentError::Projection { .. })));
    }
}
