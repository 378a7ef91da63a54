//! The four phase actions wired onto the turn orchestrator.
//!
//! ACT lets every clan choose a behavior; EXECUTE carries the behaviors
//! out; RESOLVE settles the operation queue and logs the turn summary;
//! TURN_END advances the turn counter and resets the clock. Each phase
//! stamps its name onto the game clock entity as it starts, so observing
//! clients can follow the cycle.
//!
//! Per-clan failures are logged and never abort a phase: a failing clan
//! degrades to "did nothing this turn". Each phase is a barrier -- it
//! completes only after every clan's submission has finished.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::json;
use tracing::{debug, info, warn};
use weald_agents::{CLAN_TYPE, ClanView, ConsoleSink, choose_behavior, queue_wander_action};
use weald_core::{
    EntityWriter as _, OperationQueue, PauseSignal, PhaseAction, PhaseError, StateStore,
};
use weald_types::TurnPhase;
use weald_world::MapCache;

use crate::events::TurnEvents;
use crate::store::MemoryStore;

/// Everything the phase actions share.
#[derive(Clone)]
pub struct PhaseContext {
    /// The authoritative store.
    pub store: Arc<MemoryStore>,
    /// The terrain lookup.
    pub cache: Arc<MapCache>,
    /// The operation queue client.
    pub queue: Arc<OperationQueue>,
    /// Best-effort console narration.
    pub console: Arc<dyn ConsoleSink>,
    /// The global pause flag.
    pub pause: Arc<PauseSignal>,
    /// Turn-lifecycle event publication.
    pub events: Arc<TurnEvents>,
}

/// Register the four phases on an orchestrator in cycle order.
pub fn register_phases(
    orchestrator: &mut weald_core::TurnOrchestrator,
    ctx: &PhaseContext,
) {
    orchestrator.register_phase(TurnPhase::Act, Arc::new(ActPhase { ctx: ctx.clone() }));
    orchestrator.register_phase(
        TurnPhase::Execute,
        Arc::new(ExecutePhase { ctx: ctx.clone() }),
    );
    orchestrator.register_phase(
        TurnPhase::Resolve,
        Arc::new(ResolvePhase { ctx: ctx.clone() }),
    );
    orchestrator.register_phase(
        TurnPhase::TurnEnd,
        Arc::new(TurnEndPhase { ctx: ctx.clone() }),
    );
}

/// Stamp the clock entity with the phase that is starting.
async fn stamp_clock(
    store: &MemoryStore,
    phase: TurnPhase,
    processing: bool,
) -> Result<(), PhaseError> {
    let (clock_id, _) = store.game_clock().await?;
    let _ = store
        .save_properties(
            &clock_id,
            json!({"turnPhase": phase, "turnProcessing": processing}),
        )
        .await?;
    Ok(())
}

/// Load every clan as a projected view; malformed clans are logged and
/// skipped.
async fn load_clans(store: &MemoryStore) -> Result<Vec<ClanView>, PhaseError> {
    let ids = store.find_keys_by_type(CLAN_TYPE).await?;
    let entities = store.find_by_ids(&ids).await?;
    let mut clans = Vec::with_capacity(entities.len());
    for entity in entities.values() {
        match ClanView::from_entity(entity) {
            Ok(view) => clans.push(view),
            Err(e) => warn!(entity_id = %entity.id, error = %e, "skipping malformed clan"),
        }
    }
    Ok(clans)
}

/// ACT: every clan chooses its behavior for the turn.
pub struct ActPhase {
    /// Shared phase dependencies.
    ctx: PhaseContext,
}

#[async_trait]
impl PhaseAction for ActPhase {
    async fn run(&self) -> Result<(), PhaseError> {
        if self.ctx.pause.is_paused() {
            return Ok(());
        }
        stamp_clock(&self.ctx.store, TurnPhase::Act, true).await?;

        let clans = load_clans(&self.ctx.store).await?;
        debug!(clan_count = clans.len(), "ACT: choosing behaviors");

        // Clans decide concurrently; the join is the phase barrier.
        let results = join_all(clans.iter().map(|clan| {
            let store = Arc::clone(&self.ctx.store);
            let pause = Arc::clone(&self.ctx.pause);
            async move { choose_behavior(clan, &pause, store.as_ref()).await }
        }))
        .await;

        for (clan, result) in clans.iter().zip(results) {
            if let Err(e) = result {
                warn!(clan = %clan.name, error = %e, "behavior choice failed");
            }
        }
        Ok(())
    }
}

/// EXECUTE: wandering clans move.
pub struct ExecutePhase {
    /// Shared phase dependencies.
    ctx: PhaseContext,
}

#[async_trait]
impl PhaseAction for ExecutePhase {
    async fn run(&self) -> Result<(), PhaseError> {
        if self.ctx.pause.is_paused() {
            return Ok(());
        }
        stamp_clock(&self.ctx.store, TurnPhase::Execute, true).await?;

        let clans = load_clans(&self.ctx.store).await?;
        // One grid snapshot serves the whole phase; agents never re-read
        // the cache mid-decision.
        let grid = self.ctx.cache.snapshot();
        debug!(clan_count = clans.len(), "EXECUTE: queueing actions");

        let results = join_all(clans.iter().map(|clan| {
            let grid = Arc::clone(&grid);
            let queue = Arc::clone(&self.ctx.queue);
            let console = Arc::clone(&self.ctx.console);
            async move { queue_wander_action(clan, &grid, &queue, console.as_ref()).await }
        }))
        .await;

        for (clan, result) in clans.iter().zip(results) {
            if let Err(e) = result {
                warn!(clan = %clan.name, error = %e, "wander action failed");
            }
        }
        Ok(())
    }
}

/// RESOLVE: settle the operation queue and log the turn summary.
pub struct ResolvePhase {
    /// Shared phase dependencies.
    ctx: PhaseContext,
}

#[async_trait]
impl PhaseAction for ResolvePhase {
    async fn run(&self) -> Result<(), PhaseError> {
        if self.ctx.pause.is_paused() {
            return Ok(());
        }
        stamp_clock(&self.ctx.store, TurnPhase::Resolve, true).await?;

        let stats = self.ctx.queue.drain_stats();
        info!(
            submitted = stats.submitted,
            applied = stats.applied,
            rejected = stats.rejected,
            "RESOLVE: turn operations settled"
        );
        Ok(())
    }
}

/// TURN_END: advance the turn counter and reset the clock to ACT.
pub struct TurnEndPhase {
    /// Shared phase dependencies.
    ctx: PhaseContext,
}

#[async_trait]
impl PhaseAction for TurnEndPhase {
    async fn run(&self) -> Result<(), PhaseError> {
        if self.ctx.pause.is_paused() {
            return Ok(());
        }

        let (clock_id, clock) = self.ctx.store.game_clock().await?;
        let next_turn = clock
            .current_turn
            .checked_add(1)
            .ok_or_else(|| PhaseError::new("turn counter overflow"))?;

        let _ = self
            .ctx
            .store
            .save_properties(
                &clock_id,
                json!({
                    "currentTurn": next_turn,
                    "turnPhase": TurnPhase::Act,
                    "turnProcessing": false,
                }),
            )
            .await?;

        let clan_count = self
            .ctx
            .store
            .find_keys_by_type(CLAN_TYPE)
            .await
            .map(|ids| ids.len())
            .unwrap_or(0);
        self.ctx.events.publish_turn_complete(next_turn, clan_count).await;

        info!(turn = next_turn, clan_count, "turn complete");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use weald_agents::NullConsole;
    use weald_core::config::WorldConfig;
    use weald_sync::SnapshotSource;
    use weald_types::Behavior;

    use super::*;
    use crate::seed::seed_world;

    async fn seeded_context(clan_count: u32) -> PhaseContext {
        let store = Arc::new(MemoryStore::new());
        let config = WorldConfig {
            width: 8,
            height: 8,
            seed: 11,
            clan_count,
        };
        let _ = seed_world(&store, &config).await.unwrap();

        let cache = Arc::new(MapCache::new());
        let entities = store.visible_entities().await.unwrap();
        let _ = cache.rebuild_from_entities(&entities);

        let queue = Arc::new(OperationQueue::new(
            Arc::clone(&store) as Arc<dyn weald_core::ApplyPipeline>,
        ));

        PhaseContext {
            store,
            cache,
            queue,
            console: Arc::new(NullConsole),
            pause: Arc::new(PauseSignal::default()),
            events: Arc::new(TurnEvents::disabled()),
        }
    }

    async fn clan_views(store: &MemoryStore) -> Vec<ClanView> {
        load_clans(store).await.unwrap()
    }

    #[tokio::test]
    async fn act_phase_sets_wandering_behavior() {
        let ctx = seeded_context(3).await;
        ActPhase { ctx: ctx.clone() }.run().await.unwrap();

        for clan in clan_views(&ctx.store).await {
            assert_eq!(clan.behavior, Behavior::Wandering);
        }
        let (_, clock) = ctx.store.game_clock().await.unwrap();
        assert_eq!(clock.turn_phase, TurnPhase::Act);
        assert!(clock.turn_processing);
    }

    #[tokio::test]
    async fn execute_phase_moves_wandering_clans_to_passable_hexes() {
        let ctx = seeded_context(3).await;
        ActPhase { ctx: ctx.clone() }.run().await.unwrap();
        let before = clan_views(&ctx.store).await;

        ExecutePhase { ctx: ctx.clone() }.run().await.unwrap();

        let grid = ctx.cache.snapshot();
        let after = clan_views(&ctx.store).await;
        for clan in &after {
            let hex = grid.get(clan.location.x, clan.location.y).unwrap();
            assert!(hex.passable, "clan moved onto impassable hex");
        }
        // Clans surrounded by passable hexes must actually have moved.
        for (old, new) in before.iter().zip(after.iter()) {
            if !grid.passable_neighbors(old.location).is_empty() {
                assert_ne!(old.location, new.location, "clan {0} did not move", old.name);
            }
        }
    }

    #[tokio::test]
    async fn turn_end_increments_exactly_once_and_resets() {
        let ctx = seeded_context(1).await;
        // Put the clock mid-cycle first.
        stamp_clock(&ctx.store, TurnPhase::Resolve, true).await.unwrap();

        TurnEndPhase { ctx: ctx.clone() }.run().await.unwrap();

        let (_, clock) = ctx.store.game_clock().await.unwrap();
        assert_eq!(clock.current_turn, 1);
        assert_eq!(clock.turn_phase, TurnPhase::Act);
        assert!(!clock.turn_processing);
    }

    #[tokio::test]
    async fn paused_phases_touch_nothing() {
        let ctx = seeded_context(2).await;
        ctx.pause.pause();
        let _ = ctx.store.drain_applied().await;

        ActPhase { ctx: ctx.clone() }.run().await.unwrap();
        ExecutePhase { ctx: ctx.clone() }.run().await.unwrap();
        ResolvePhase { ctx: ctx.clone() }.run().await.unwrap();
        TurnEndPhase { ctx: ctx.clone() }.run().await.unwrap();

        // No clock movement, no behavior writes, no operations.
        let (_, clock) = ctx.store.game_clock().await.unwrap();
        assert_eq!(clock.current_turn, 0);
        assert_eq!(clock.turn_phase, TurnPhase::Act);
        assert!(!clock.turn_processing);
        for clan in clan_views(&ctx.store).await {
            assert_eq!(clan.behavior, Behavior::None);
        }
        assert!(ctx.store.drain_applied().await.is_empty());
    }

    #[tokio::test]
    async fn each_cycle_adds_exactly_one_turn() {
        let ctx = seeded_context(2).await;

        for _ in 0..2 {
            ActPhase { ctx: ctx.clone() }.run().await.unwrap();
            ExecutePhase { ctx: ctx.clone() }.run().await.unwrap();
            ResolvePhase { ctx: ctx.clone() }.run().await.unwrap();
            TurnEndPhase { ctx: ctx.clone() }.run().await.unwrap();
        }

        let (_, clock) = ctx.store.game_clock().await.unwrap();
        assert_eq!(clock.current_turn, 2);
    }
}
