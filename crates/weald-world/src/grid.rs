//! The hex grid: coordinate-keyed terrain lookup built from map entities.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, warn};
use weald_types::{Entity, Terrain, Vector2};

use crate::hex::{Hex, chebyshev_neighbors};

/// The entity type tag of map hex entities.
pub const MAP_HEX_TYPE: &str = "MapHex";

/// The portion of a map hex entity's state the grid cares about.
#[derive(Debug, Deserialize)]
struct HexState {
    /// Where the hex sits on the grid.
    location: Vector2,
    /// Terrain classification; cost and passability derive from it.
    terrain: Terrain,
}

/// An immutable coordinate-keyed lookup of terrain hexes.
///
/// Built wholesale from the full set of terrain entities; never mutated
/// in place afterwards. Absence of an entry means "no such hex" and is
/// treated as impassable.
#[derive(Debug, Clone, Default)]
pub struct HexGrid {
    /// Hexes keyed by `(x, y)`.
    cells: HashMap<(i32, i32), Hex>,
}

impl HexGrid {
    /// Create an empty grid.
    pub fn new() -> Self {
        Self {
            cells: HashMap::new(),
        }
    }

    /// Build a grid from terrain entities, skipping anything that is not a
    /// well-formed map hex. Returns the grid and the number of skipped
    /// entities.
    pub fn from_entities(entities: &[Entity]) -> (Self, usize) {
        let mut grid = Self::new();
        let mut skipped = 0_usize;

        for entity in entities {
            if entity.entity_type != MAP_HEX_TYPE {
                continue;
            }
            match serde_json::from_value::<HexState>(entity.state.clone()) {
                Ok(state) => {
                    grid.insert(Hex::from_terrain(
                        state.location.x,
                        state.location.y,
                        state.terrain,
                    ));
                }
                Err(e) => {
                    warn!(entity_id = %entity.id, error = %e, "skipping malformed map hex");
                    skipped = skipped.saturating_add(1);
                }
            }
        }

        debug!(
            hex_count = grid.len(),
            skipped, "hex grid built from entities"
        );
        (grid, skipped)
    }

    /// Insert a hex, replacing any previous hex at the same coordinates.
    pub fn insert(&mut self, hex: Hex) {
        self.cells.insert((hex.x, hex.y), hex);
    }

    /// Look up the hex at `(x, y)`.
    pub fn get(&self, x: i32, y: i32) -> Option<Hex> {
        self.cells.get(&(x, y)).copied()
    }

    /// Number of hexes in the grid.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when the grid holds no hexes.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over all hexes in the grid.
    pub fn hexes(&self) -> impl Iterator<Item = &Hex> {
        self.cells.values()
    }

    /// The passable hexes among the 8 Chebyshev neighbors of `center`,
    /// in deterministic scan order. Missing hexes count as impassable.
    pub fn passable_neighbors(&self, center: Vector2) -> Vec<Hex> {
        chebyshev_neighbors(center)
            .into_iter()
            .filter_map(|at| self.get(at.x, at.y))
            .filter(|hex| hex.passable)
            .collect()
    }
}
