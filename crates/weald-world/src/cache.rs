//! Read-mostly concurrent access to the hex grid.
//!
//! Lookup is the hot path: every clan consults the map every turn, often
//! from parallel tasks within one phase. The cache therefore hands out
//! cheap [`Arc`] snapshots of an immutable [`HexGrid`]; a rebuild swaps
//! the whole grid atomically rather than mutating entries in place, so a
//! reader iterating a neighborhood always sees one consistent map.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;
use weald_types::Entity;

use crate::grid::HexGrid;
use crate::hex::Hex;

/// Shared, swap-on-rebuild terrain lookup.
#[derive(Debug, Default)]
pub struct MapCache {
    /// The current grid. Readers clone the `Arc`; writers replace it.
    grid: RwLock<Arc<HexGrid>>,
}

impl MapCache {
    /// Create a cache holding an empty grid.
    pub fn new() -> Self {
        Self {
            grid: RwLock::new(Arc::new(HexGrid::new())),
        }
    }

    /// Take a snapshot of the current grid.
    ///
    /// The snapshot stays valid (and consistent) even if a rebuild swaps
    /// the cache underneath it.
    pub fn snapshot(&self) -> Arc<HexGrid> {
        let guard = self
            .grid
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Look up the hex at `(x, y)` in the current grid.
    ///
    /// `None` means "no such hex", which callers treat as impassable.
    pub fn get(&self, x: i32, y: i32) -> Option<Hex> {
        self.snapshot().get(x, y)
    }

    /// Replace the entire grid with a freshly built one.
    pub fn rebuild(&self, grid: HexGrid) {
        let hex_count = grid.len();
        let mut guard = self
            .grid
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(grid);
        info!(hex_count, "map cache rebuilt");
    }

    /// Rebuild the grid from terrain entities. Returns the number of
    /// malformed entities that were skipped.
    pub fn rebuild_from_entities(&self, entities: &[Entity]) -> usize {
        let (grid, skipped) = HexGrid::from_entities(entities);
        self.rebuild(grid);
        skipped
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use weald_types::Terrain;

    use super::*;

    #[test]
    fn empty_cache_has_no_hexes() {
        let cache = MapCache::new();
        assert!(cache.get(0, 0).is_none());
    }

    #[test]
    fn rebuild_replaces_wholesale() {
        let cache = MapCache::new();

        let mut first = HexGrid::new();
        first.insert(Hex::from_terrain(0, 0, Terrain::Grassland));
        cache.rebuild(first);
        assert!(cache.get(0, 0).is_some());

        let mut second = HexGrid::new();
        second.insert(Hex::from_terrain(5, 5, Terrain::Meadow));
        cache.rebuild(second);

        // The old entry is gone; rebuilds do not merge.
        assert!(cache.get(0, 0).is_none());
        assert!(cache.get(5, 5).is_some());
    }

    #[test]
    fn snapshot_survives_rebuild() {
        let cache = MapCache::new();
        let mut grid = HexGrid::new();
        grid.insert(Hex::from_terrain(1, 1, Terrain::Grassland));
        cache.rebuild(grid);

        let snapshot = cache.snapshot();
        cache.rebuild(HexGrid::new());

        // The held snapshot still sees the old grid; the cache does not.
        assert!(snapshot.get(1, 1).is_some());
        assert!(cache.get(1, 1).is_none());
    }
}
