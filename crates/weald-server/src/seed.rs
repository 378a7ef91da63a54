//! World seeding: terrain, the game clock singleton, and starting clans.
//!
//! Generation is deterministic for a given seed so worlds are
//! reproducible. The border of the map is always ocean; the interior is
//! rolled from a weighted terrain pool. Clans spawn on distinct passable
//! hexes with rolled cultures and populations.

use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tracing::info;
use weald_core::StoreError;
use weald_core::config::WorldConfig;
use weald_types::{CultureGroup, Entity, EntityId, GameClock, Terrain, Vector2};
use weald_world::MAP_HEX_TYPE;

use crate::store::MemoryStore;

/// Interior terrain pool; repetition encodes the weighting.
const TERRAIN_POOL: [Terrain; 12] = [
    Terrain::Grassland,
    Terrain::Grassland,
    Terrain::Grassland,
    Terrain::Meadow,
    Terrain::Meadow,
    Terrain::Scrub,
    Terrain::Dryland,
    Terrain::Woodlands,
    Terrain::Woodlands,
    Terrain::Rockland,
    Terrain::Desert,
    Terrain::Marsh,
];

/// Starting clan name pool.
const CLAN_NAMES: [&str; 8] = [
    "Aelfen", "Brydd", "Cynred", "Dunmor", "Eofor", "Ferun", "Gledda", "Hrothi",
];

/// Culture pool for rolled clans.
const CULTURES: [CultureGroup; 6] = [
    CultureGroup::Alpine,
    CultureGroup::Desert,
    CultureGroup::Forest,
    CultureGroup::Maritime,
    CultureGroup::Plains,
    CultureGroup::Riverine,
];

/// What seeding produced.
#[derive(Debug)]
pub struct SeedSummary {
    /// The game clock singleton's entity id.
    pub clock_id: EntityId,
    /// Number of map hex entities created.
    pub hex_count: usize,
    /// Number of clans spawned.
    pub clan_count: usize,
}

/// Create the game clock, the terrain, and the starting clans.
///
/// # Errors
///
/// Returns [`StoreError`] if the world has no passable hex to spawn
/// clans on (degenerate configuration).
pub async fn seed_world(
    store: &MemoryStore,
    config: &WorldConfig,
) -> Result<SeedSummary, StoreError> {
    let mut rng = SmallRng::seed_from_u64(config.seed);

    // The clock exists before anything can move.
    let clock_id = store
        .create(Entity::new(
            GameClock::ENTITY_TYPE,
            GameClock::default().to_state(),
        ))
        .await;

    // Terrain. Border hexes are ocean so clans cannot walk off the map.
    let mut passable: Vec<Vector2> = Vec::new();
    let mut hex_count = 0_usize;
    for y in 0..config.height {
        for x in 0..config.width {
            let on_border = x == 0
                || y == 0
                || x == config.width.saturating_sub(1)
                || y == config.height.saturating_sub(1);
            let terrain = if on_border {
                Terrain::Ocean
            } else {
                TERRAIN_POOL
                    .choose(&mut rng)
                    .copied()
                    .unwrap_or(Terrain::Grassland)
            };
            if terrain.passable() {
                passable.push(Vector2::new(x, y));
            }
            let _ = store
                .create(Entity::new(
                    MAP_HEX_TYPE,
                    json!({"location": {"x": x, "y": y}, "terrain": terrain}),
                ))
                .await;
            hex_count = hex_count.saturating_add(1);
        }
    }

    if passable.is_empty() && config.clan_count > 0 {
        return Err(StoreError::Backend(String::from(
            "world has no passable hex to spawn clans on",
        )));
    }

    // Clans, each on a rolled passable hex.
    let mut clan_count = 0_usize;
    for index in 0..config.clan_count {
        let name = clan_name(index);
        let location = passable
            .choose(&mut rng)
            .copied()
            .unwrap_or(Vector2::new(1, 1));
        let culture = CULTURES
            .choose(&mut rng)
            .copied()
            .unwrap_or(CultureGroup::Unassigned);
        let population: u32 = rng.random_range(20..=60);

        let _ = store
            .create(Entity::new(
                "Clan",
                json!({
                    "name": name,
                    "population": population,
                    "culture": culture,
                    "location": {"x": location.x, "y": location.y},
                    "behavior": "NONE",
                }),
            ))
            .await;
        clan_count = clan_count.saturating_add(1);
    }

    info!(hex_count, clan_count, "world seeded");
    Ok(SeedSummary {
        clock_id,
        hex_count,
        clan_count,
    })
}

/// Pick a clan name; indexes past the pool get a numeric suffix.
fn clan_name(index: u32) -> String {
    let pool_len = u32::try_from(CLAN_NAMES.len()).unwrap_or(1);
    let base = CLAN_NAMES
        .get(usize::try_from(index.checked_rem(pool_len).unwrap_or(0)).unwrap_or(0))
        .copied()
        .unwrap_or("Clan");
    if index < pool_len {
        base.to_owned()
    } else {
        let generation = index.checked_div(pool_len).unwrap_or(0).saturating_add(1);
        format!("{base} {generation}")
    }
}
