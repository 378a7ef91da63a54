//! The per-clan decision and action cycle.
//!
//! Two operations run per clan per turn: [`choose_behavior`] during ACT
//! decides what the clan will do, and [`queue_wander_action`] during
//! EXECUTE carries the decision out by queueing a movement operation
//! against the clan's last observed version.
//!
//! Both read the global pause flag and a single map snapshot; neither
//! writes any shared state directly, so clans can be processed in
//! parallel within a phase.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde_json::json;
use tracing::{debug, info};
use weald_core::{EntityWriter, OperationQueue, PauseSignal};
use weald_types::{Behavior, Operation, Vector2};
use weald_world::{Hex, HexGrid};

use crate::clan::{CLAN_TYPE, ClanView};
use crate::console::ConsoleSink;
use crate::error::AgentError;

/// Decide the clan's behavior for this turn (the ACT step).
///
/// The current policy is fixed -- every clan wanders -- but this is the
/// extension point for policies keyed off clan state. The decision is
/// persisted as a property-only write (no location delta). A paused world
/// makes this a no-op.
///
/// # Errors
///
/// Returns [`AgentError::SaveBehavior`] if the store write fails.
pub async fn choose_behavior(
    clan: &ClanView,
    pause: &PauseSignal,
    writer: &dyn EntityWriter,
) -> Result<(), AgentError> {
    if pause.is_paused() {
        return Ok(());
    }

    debug!(clan = %clan.name, "clan decides to wander");

    let props = json!({ "behavior": Behavior::Wandering });
    writer
        .save_properties(&clan.id, props)
        .await
        .map_err(|source| AgentError::SaveBehavior {
            entity_id: clan.id.clone(),
            source,
        })?;

    Ok(())
}

/// Pick a wander destination: uniformly random over the passable Chebyshev
/// neighbors of `origin` in the given grid snapshot.
///
/// Returns `None` when no neighbor is passable; the clan stays put, which
/// is not an error.
pub fn pick_wander_destination<R: Rng + ?Sized>(
    grid: &HexGrid,
    origin: Vector2,
    rng: &mut R,
) -> Option<Vector2> {
    let candidates = grid.passable_neighbors(origin);
    candidates.choose(rng).map(Hex::location)
}

/// Carry out a wandering clan's move (the EXECUTE step).
///
/// Consults one snapshot of the map cache, picks a passable neighbor
/// uniformly at random, narrates the move on a best-effort basis, and
/// queues a location mutation with the clan's last observed version as
/// the expected version. Clans whose behavior is not `WANDERING` do
/// nothing.
///
/// Returns the chosen destination, or `None` if the clan did not move.
///
/// # Errors
///
/// Returns [`AgentError::QueueMovement`] if the apply pipeline fails
/// outright. A stale-version rejection is not an error; the clan simply
/// re-observes current state next turn.
pub async fn queue_wander_action(
    clan: &ClanView,
    grid: &HexGrid,
    queue: &OperationQueue,
    console: &dyn ConsoleSink,
) -> Result<Option<Vector2>, AgentError> {
    if clan.behavior != Behavior::Wandering {
        return Ok(None);
    }

    // The RNG stays inside this block so the selection happens on one
    // consistent snapshot before any suspension point.
    let destination = {
        let mut rng = rand::rng();
        pick_wander_destination(grid, clan.location, &mut rng)
    };

    let Some(destination) = destination else {
        debug!(clan = %clan.name, at = %clan.location, "no passable neighbor, staying put");
        return Ok(None);
    };

    info!(
        clan = %clan.name,
        from = %clan.location,
        to = %destination,
        "clan is wandering"
    );

    console
        .broadcast_console(&format!(
            "Clan {} is wandering to {}, {}",
            clan.name, destination.x, destination.y
        ))
        .await;

    let operation = Operation::mutate(
        clan.id.clone(),
        clan.version,
        CLAN_TYPE,
        json!({ "location": { "x": destination.x, "y": destination.y } }),
    );

    queue
        .queue(operation)
        .await
        .map_err(|source| AgentError::QueueMovement {
            entity_id: clan.id.clone(),
            source,
        })?;

    Ok(Some(destination))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use serde_json::Value;
    use weald_core::{Applied, ApplyError, ApplyPipeline, StoreError};
    use weald_types::{EntityId, Terrain};

    use super::*;

    /// Pipeline stub that records every operation it applies.
    #[derive(Default)]
    struct RecordingPipeline {
        operations: Mutex<Vec<Operation>>,
    }

    #[async_trait]
    impl ApplyPipeline for RecordingPipeline {
        async fn apply(&self, operation: Operation) -> Result<Applied, ApplyError> {
            let applied = Applied {
                entity_id: operation.entity_id.clone(),
                entity_type: operation.entity_type.clone(),
                new_version: operation.expected_version.saturating_add(1),
                delta: operation.delta.clone(),
            };
            self.operations.lock().unwrap().push(operation);
            Ok(applied)
        }
    }

    /// Writer stub that records property saves.
    #[derive(Default)]
    struct RecordingWriter {
        saves: Mutex<Vec<(EntityId, Value)>>,
    }

    #[async_trait]
    impl weald_core::EntityWriter for RecordingWriter {
        async fn save_properties(
            &self,
            id: &EntityId,
            props: Value,
        ) -> Result<u64, StoreError> {
            self.saves.lock().unwrap().push((id.clone(), props));
            Ok(1)
        }
    }

    /// Console stub that records broadcast lines.
    #[derive(Default)]
    struct RecordingConsole {
        lines: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ConsoleSink for RecordingConsole {
        async fn broadcast_console(&self, message: &str) {
            self.lines.lock().unwrap().push(message.to_owned());
        }
    }

    fn make_clan(behavior: Behavior) -> ClanView {
        ClanView {
            id: EntityId::from_raw("clan-1"),
            version: 7,
            name: String::from("Aelfen"),
            population: 40,
            culture: weald_types::CultureGroup::Plains,
            location: Vector2::new(1, 1),
            behavior,
        }
    }

    /// A full 3x3 block around (1, 1) with (0, 0) impassable.
    fn block_with_corner_blocked() -> HexGrid {
        let mut grid = HexGrid::new();
        for x in 0..=2 {
            for y in 0..=2 {
                let terrain = if x == 0 && y == 0 {
                    Terrain::Ocean
                } else {
                    Terrain::Grassland
                };
                grid.insert(Hex::from_terrain(x, y, terrain));
            }
        }
        grid
    }

    #[test]
    fn destination_is_always_a_passable_neighbor() {
        let grid = block_with_corner_blocked();
        let mut rng = SmallRng::seed_from_u64(1);
        let origin = Vector2::new(1, 1);

        let mut seen = BTreeSet::new();
        for _ in 0..200 {
            let destination = pick_wander_destination(&grid, origin, &mut rng).unwrap();
            assert_ne!(destination, Vector2::new(0, 0), "impassable hex chosen");
            assert_ne!(destination, origin, "center chosen");
            seen.insert((destination.x, destination.y));
        }

        // 200 uniform draws over 7 candidates visit every candidate.
        assert_eq!(seen.len(), 7);
    }

    #[test]
    fn no_candidates_means_no_destination() {
        let mut grid = HexGrid::new();
        grid.insert(Hex::from_terrain(1, 1, Terrain::Grassland));
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(pick_wander_destination(&grid, Vector2::new(1, 1), &mut rng).is_none());
    }

    #[tokio::test]
    async fn wander_queues_location_operation() {
        let pipeline = Arc::new(RecordingPipeline::default());
        let queue = OperationQueue::new(Arc::clone(&pipeline) as Arc<dyn ApplyPipeline>);
        let console = RecordingConsole::default();
        let clan = make_clan(Behavior::Wandering);
        let grid = block_with_corner_blocked();

        let moved = queue_wander_action(&clan, &grid, &queue, &console)
            .await
            .unwrap();
        let destination = moved.unwrap();

        let operations = pipeline.operations.lock().unwrap();
        assert_eq!(operations.len(), 1);
        let op = operations.first().unwrap();
        assert_eq!(op.entity_id, clan.id);
        assert_eq!(op.expected_version, 7);
        assert_eq!(op.entity_type, CLAN_TYPE);
        assert_eq!(
            op.delta,
            serde_json::json!({"location": {"x": destination.x, "y": destination.y}})
        );

        // The move was narrated.
        let lines = console.lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines.first().unwrap().starts_with("Clan Aelfen is wandering to"));
    }

    #[tokio::test]
    async fn empty_candidate_set_emits_nothing() {
        let pipeline = Arc::new(RecordingPipeline::default());
        let queue = OperationQueue::new(Arc::clone(&pipeline) as Arc<dyn ApplyPipeline>);
        let console = RecordingConsole::default();
        let clan = make_clan(Behavior::Wandering);
        // The clan's own hex exists but nothing around it does.
        let mut grid = HexGrid::new();
        grid.insert(Hex::from_terrain(1, 1, Terrain::Grassland));

        let moved = queue_wander_action(&clan, &grid, &queue, &console)
            .await
            .unwrap();
        assert!(moved.is_none());
        assert!(pipeline.operations.lock().unwrap().is_empty());
        assert!(console.lines.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_wandering_clan_does_nothing() {
        let pipeline = Arc::new(RecordingPipeline::default());
        let queue = OperationQueue::new(Arc::clone(&pipeline) as Arc<dyn ApplyPipeline>);
        let console = RecordingConsole::default();
        let clan = make_clan(Behavior::None);
        let grid = block_with_corner_blocked();

        let moved = queue_wander_action(&clan, &grid, &queue, &console)
            .await
            .unwrap();
        assert!(moved.is_none());
        assert!(pipeline.operations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn choose_behavior_writes_wandering() {
        let writer = RecordingWriter::default();
        let pause = PauseSignal::default();
        let clan = make_clan(Behavior::None);

        choose_behavior(&clan, &pause, &writer).await.unwrap();

        let saves = writer.saves.lock().unwrap();
        assert_eq!(saves.len(), 1);
        let (id, props) = saves.first().unwrap();
        assert_eq!(id, &clan.id);
        assert_eq!(props, &serde_json::json!({"behavior": "WANDERING"}));
    }

    #[tokio::test]
    async fn choose_behavior_is_noop_while_paused() {
        let writer = RecordingWriter::default();
        let pause = PauseSignal::new(true);
        let clan = make_clan(Behavior::None);

        choose_behavior(&clan, &pause, &writer).await.unwrap();
        assert!(writer.saves.lock().unwrap().is_empty());
    }
}
