//! Enumeration types shared across the Weald workspace.
//!
//! Wire casing matches the original protocol: phases and behaviors are
//! SCREAMING_SNAKE_CASE strings, terrain and culture variants likewise.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One stage of the turn cycle.
///
/// The orchestrator traverses phases in this order and loops forever:
/// ACT -> EXECUTE -> RESOLVE -> TURN_END -> ACT ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnPhase {
    /// Agents decide what they will do this turn.
    Act,
    /// Agents carry out the behavior chosen during ACT.
    Execute,
    /// Queued operations settle; the turn summary is produced.
    Resolve,
    /// The turn counter advances and the clock resets to ACT.
    TurnEnd,
}

impl TurnPhase {
    /// The phase that follows this one in the cycle.
    pub const fn next(self) -> Self {
        match self {
            Self::Act => Self::Execute,
            Self::Execute => Self::Resolve,
            Self::Resolve => Self::TurnEnd,
            Self::TurnEnd => Self::Act,
        }
    }

    /// Wire name of the phase (as persisted on the game clock entity).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Act => "ACT",
            Self::Execute => "EXECUTE",
            Self::Resolve => "RESOLVE",
            Self::TurnEnd => "TURN_END",
        }
    }
}

/// Behavior a clan has committed to for the current turn.
///
/// Set during ACT, consumed during EXECUTE. Currently the only active
/// policy is wandering; the enum is the extension point for future ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Behavior {
    /// The clan does nothing this turn.
    #[default]
    None,
    /// The clan moves to a random passable neighboring hex.
    Wandering,
}

/// Terrain classification of a map hex.
///
/// Passability and movement cost derive from the terrain; a hex entity
/// carries only its terrain tag and coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Terrain {
    /// No terrain assigned; treated as impassable.
    #[default]
    Unassigned,
    /// Open water.
    Ocean,
    /// Flat grass plains.
    Grassland,
    /// Low flowering grassland.
    Meadow,
    /// Sparse brush.
    Scrub,
    /// Arid steppe.
    Dryland,
    /// Dense forest.
    Woodlands,
    /// Exposed rock and talus.
    Rockland,
    /// Sand desert.
    Desert,
    /// Wetland; impassable to clans on foot.
    Marsh,
}

impl Terrain {
    /// Whether clans can enter a hex of this terrain.
    pub const fn passable(self) -> bool {
        !matches!(self, Self::Unassigned | Self::Ocean | Self::Marsh)
    }

    /// Movement cost of entering a hex of this terrain.
    ///
    /// Impassable terrain reports cost 0; callers must check
    /// [`passable`](Self::passable) first.
    pub const fn movement_cost(self) -> u32 {
        match self {
            Self::Unassigned | Self::Ocean | Self::Marsh => 0,
            Self::Grassland | Self::Meadow => 1,
            Self::Scrub | Self::Dryland => 2,
            Self::Woodlands | Self::Desert => 3,
            Self::Rockland => 4,
        }
    }
}

/// Culture group a clan belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CultureGroup {
    /// Not yet assigned to a culture.
    #[default]
    Unassigned,
    /// Mountain peoples.
    Alpine,
    /// Desert peoples.
    Desert,
    /// Forest peoples.
    Forest,
    /// Coastal peoples.
    Maritime,
    /// Plains peoples.
    Plains,
    /// River-valley peoples.
    Riverine,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn phase_cycle_loops() {
        assert_eq!(TurnPhase::Act.next(), TurnPhase::Execute);
        assert_eq!(TurnPhase::Execute.next(), TurnPhase::Resolve);
        assert_eq!(TurnPhase::Resolve.next(), TurnPhase::TurnEnd);
        assert_eq!(TurnPhase::TurnEnd.next(), TurnPhase::Act);
    }

    #[test]
    fn phase_wire_casing() {
        let json = serde_json::to_string(&TurnPhase::TurnEnd).unwrap();
        assert_eq!(json, "\"TURN_END\"");
        let restored: TurnPhase = serde_json::from_str("\"ACT\"").unwrap();
        assert_eq!(restored, TurnPhase::Act);
    }

    #[test]
    fn behavior_wire_casing() {
        assert_eq!(
            serde_json::to_string(&Behavior::Wandering).unwrap(),
            "\"WANDERING\""
        );
        let restored: Behavior = serde_json::from_str("\"NONE\"").unwrap();
        assert_eq!(restored, Behavior::None);
    }

    #[test]
    fn ocean_and_marsh_are_impassable() {
        assert!(!Terrain::Ocean.passable());
        assert!(!Terrain::Marsh.passable());
        assert!(!Terrain::Unassigned.passable());
        assert!(Terrain::Grassland.passable());
        assert!(Terrain::Rockland.passable());
    }

    #[test]
    fn passable_terrain_has_nonzero_cost() {
        for terrain in [
            Terrain::Grassland,
            Terrain::Meadow,
            Terrain::Scrub,
            Terrain::Dryland,
            Terrain::Woodlands,
            Terrain::Rockland,
            Terrain::Desert,
        ] {
            assert!(terrain.movement_cost() > 0, "{terrain:?}");
        }
    }
}
