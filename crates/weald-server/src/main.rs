//! World server binary for the Weald simulation.
//!
//! Wires together the in-memory store, the seeded starting world, the
//! turn orchestrator, the sync gateway, and the frame scheduler.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `weald-config.yaml`
//! 3. Create the store and seed the world (clock, terrain, clans)
//! 4. Build the map cache from the terrain entities
//! 5. Assemble the sync gateway (registry, batcher, routes)
//! 6. Connect the turn event publisher (optional NATS)
//! 7. Register the four phases on the orchestrator
//! 8. Spawn the fixed-rate frame loop
//! 9. Serve HTTP/WebSocket until the process is terminated

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use tracing::info;
use tracing_subscriber::EnvFilter;
use weald_core::config::SimulationConfig;
use weald_core::{OperationQueue, PauseSignal, TurnOrchestrator};
use weald_server::handlers::AppState;
use weald_server::phases::PhaseContext;
use weald_server::{
    ConsoleRelay, MemoryStore, TurnEvents, build_router, register_phases, run_frame_loop,
    seed_world,
};
use weald_sync::{SnapshotSource as _, SyncState, UpdateBatcher};
use weald_world::MapCache;

/// Application entry point for the world server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("weald-server starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        width = config.world.width,
        height = config.world.height,
        seed = config.world.seed,
        clan_count = config.world.clan_count,
        frame_interval_ms = config.frame.frame_interval_ms,
        "Configuration loaded"
    );

    // 3. Create the store and seed the world.
    let store = Arc::new(MemoryStore::new());
    let summary = seed_world(&store, &config.world)
        .await
        .context("world seeding failed")?;
    info!(
        hex_count = summary.hex_count,
        clan_count = summary.clan_count,
        "World seeded"
    );

    // 4. Build the map cache.
    let cache = Arc::new(MapCache::new());
    let entities = store
        .visible_entities()
        .await
        .context("terrain snapshot failed")?;
    let skipped = cache.rebuild_from_entities(&entities);
    info!(skipped, "Map cache built");

    // 5. Assemble the sync gateway.
    let sync_state = Arc::new(SyncState::new(
        Arc::clone(&store) as Arc<dyn weald_sync::SnapshotSource>,
    ));
    let batcher = Arc::new(UpdateBatcher::new(Arc::clone(&sync_state.registry)));

    // 6. Connect the turn event publisher.
    let events = Arc::new(TurnEvents::connect(config.infrastructure.nats_url.as_deref()).await);

    // 7. Register phases on the orchestrator.
    let pause = Arc::new(PauseSignal::default());
    let queue = Arc::new(OperationQueue::new(
        Arc::clone(&store) as Arc<dyn weald_core::ApplyPipeline>,
    ));
    let mut orchestrator = TurnOrchestrator::new(Arc::clone(&pause));
    let phase_ctx = PhaseContext {
        store: Arc::clone(&store),
        cache: Arc::clone(&cache),
        queue,
        console: Arc::new(ConsoleRelay::new(Arc::clone(&batcher))),
        pause: Arc::clone(&pause),
        events,
    };
    register_phases(&mut orchestrator, &phase_ctx);
    info!("Turn phases registered");

    // 8. Spawn the frame loop.
    let frame_store = Arc::clone(&store);
    let frame_batcher = Arc::clone(&batcher);
    let frame_interval_ms = config.frame.frame_interval_ms;
    tokio::spawn(async move {
        run_frame_loop(orchestrator, frame_store, frame_batcher, frame_interval_ms).await;
    });

    // 9. Serve until terminated.
    let app_state = AppState {
        store,
        pause,
        sync: Arc::clone(&sync_state),
    };
    let router = build_router(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind failed on {addr}"))?;
    info!(%addr, "Weald server listening");

    axum::serve(listener, router)
        .await
        .context("serve error")?;

    Ok(())
}

/// Load the simulation configuration from `weald-config.yaml`, falling
/// back to defaults when the file is absent.
fn load_config() -> anyhow::Result<SimulationConfig> {
    let config_path = Path::new("weald-config.yaml");
    if config_path.exists() {
        SimulationConfig::from_file(config_path).context("failed to load weald-config.yaml")
    } else {
        info!("Config file not found, using defaults");
        Ok(SimulationConfig::default())
    }
}
