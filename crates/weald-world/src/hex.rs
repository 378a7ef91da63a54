//! Hexes and grid neighborhoods.
//!
//! A [`Hex`] is the immutable terrain record the behavior engine consults:
//! coordinates, movement cost, and a passability flag. Neighborhoods are
//! Chebyshev: the 3x3 block around a center, minus the center itself.

use serde::{Deserialize, Serialize};
use weald_types::{Terrain, Vector2};

/// One cell of the world map, as cached for fast lookup.
///
/// Immutable once the grid is built; rebuilds replace the whole grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hex {
    /// Column coordinate.
    pub x: i32,
    /// Row coordinate.
    pub y: i32,
    /// Cost of moving into this hex.
    pub movement_cost: u32,
    /// Whether clans can enter this hex.
    pub passable: bool,
}

impl Hex {
    /// Build a hex from its coordinates and terrain classification.
    pub const fn from_terrain(x: i32, y: i32, terrain: Terrain) -> Self {
        Self {
            x,
            y,
            movement_cost: terrain.movement_cost(),
            passable: terrain.passable(),
        }
    }

    /// The hex's coordinates as a vector.
    pub const fn location(&self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }
}

/// The 8 Chebyshev neighbors of a coordinate: the 3x3 block minus the
/// center. Order is deterministic (row-major scan).
///
/// Coordinates saturate at the i32 range edges; a center at the numeric
/// boundary simply yields fewer distinct neighbors.
pub fn chebyshev_neighbors(center: Vector2) -> Vec<Vector2> {
    let mut neighbors = Vec::with_capacity(8);
    for dy in -1_i32..=1 {
        for dx in -1_i32..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            neighbors.push(Vector2::new(
                center.x.saturating_add(dx),
                center.y.saturating_add(dy),
            ));
        }
    }
    neighbors
}
