//! End-to-end tests for the dual-channel sync protocol.
//!
//! Each test spins up a real in-process server (store, gateway, router,
//! TCP listener) and drives it with the observing [`SyncClient`] or a raw
//! WebSocket, exercising the five-step handshake, delta broadcast and
//! reconciliation, console fan-out, and the handshake failure paths.

// Integration tests use unwrap/expect extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::arithmetic_side_effects,
    clippy::missing_panics_doc,
    clippy::too_many_lines
)]

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use weald_core::config::WorldConfig;
use weald_core::{ApplyPipeline, EntityWriter, PauseSignal, StateStore};
use weald_server::handlers::AppState;
use weald_server::{MemoryStore, build_router, seed_world};
use weald_sync::{ClientEvent, SyncClient, SyncState, UpdateBatcher};
use weald_types::{EntityId, Operation};

/// How long any single protocol step may take before the test fails.
const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// A running in-process server.
struct TestServer {
    base_url: String,
    store: Arc<MemoryStore>,
    batcher: Arc<UpdateBatcher>,
}

/// Start a server on an ephemeral port with a small seeded world.
async fn start_server() -> TestServer {
    let store = Arc::new(MemoryStore::new());
    let config = WorldConfig {
        width: 6,
        height: 6,
        seed: 5,
        clan_count: 2,
    };
    let _ = seed_world(&store, &config).await.unwrap();

    let sync_state = Arc::new(SyncState::new(
        Arc::clone(&store) as Arc<dyn weald_sync::SnapshotSource>,
    ));
    let batcher = Arc::new(UpdateBatcher::new(Arc::clone(&sync_state.registry)));
    let app_state = AppState {
        store: Arc::clone(&store),
        pause: Arc::new(PauseSignal::default()),
        sync: sync_state,
    };
    let router = build_router(app_state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestServer {
        base_url: format!("ws://{addr}"),
        store,
        batcher,
    }
}

/// Pick one seeded clan: (id, version, x, y).
async fn first_clan(store: &MemoryStore) -> (EntityId, u64, i64, i64) {
    let ids = store.find_keys_by_type("Clan").await.unwrap();
    let id = ids.first().unwrap().clone();
    let entity = store.get(&id).await.unwrap();
    let location = entity.state.get("location").unwrap();
    (
        id,
        entity.version,
        location.get("x").unwrap().as_i64().unwrap(),
        location.get("y").unwrap().as_i64().unwrap(),
    )
}

/// Push everything the store committed out to paired clients.
async fn flush_committed(server: &TestServer) -> usize {
    let committed = server.store.drain_applied().await;
    for applied in &committed {
        server.batcher.stage(applied).await;
    }
    server.batcher.flush().await
}

#[tokio::test]
async fn full_handshake_ingests_complete_snapshot() {
    let server = start_server().await;
    let client = timeout(STEP_TIMEOUT, SyncClient::connect(&server.base_url))
        .await
        .unwrap()
        .unwrap();

    // 36 hexes + 2 clans + the clock.
    assert_eq!(client.cache().len(), server.store.entity_count().await);
    assert_eq!(client.cache().of_type("Clan").count(), 2);
    assert_eq!(client.cache().of_type("GameClock").count(), 1);
    assert!(!client.connection_id().is_empty());
}

#[tokio::test]
async fn committed_delta_reaches_client_and_merges_field_wise() {
    let server = start_server().await;
    let mut client = timeout(STEP_TIMEOUT, SyncClient::connect(&server.base_url))
        .await
        .unwrap()
        .unwrap();

    let (clan_id, version, _x, y) = first_clan(&server.store).await;

    // Server-side commit: move the clan along x only.
    let applied = server
        .store
        .apply(Operation::mutate(
            clan_id.clone(),
            version,
            "Clan",
            json!({"location": {"x": 42}}),
        ))
        .await
        .unwrap();
    assert_eq!(applied.new_version, version + 1);
    assert_eq!(flush_committed(&server).await, 1);

    let event = timeout(STEP_TIMEOUT, client.next_event())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, ClientEvent::Batch { applied: 1 });

    // The client cache converged: x overwritten, y preserved, version
    // adopted.
    let cached = client.cache().get(&clan_id).unwrap();
    assert_eq!(cached.version, version + 1);
    let location = cached.state.get("location").unwrap();
    assert_eq!(location.get("x").unwrap().as_i64().unwrap(), 42);
    assert_eq!(location.get("y").unwrap().as_i64().unwrap(), y);
}

#[tokio::test]
async fn stale_operation_is_rejected_and_never_broadcast() {
    let server = start_server().await;
    let _client = timeout(STEP_TIMEOUT, SyncClient::connect(&server.base_url))
        .await
        .unwrap()
        .unwrap();

    let (clan_id, version, _x, _y) = first_clan(&server.store).await;

    // Commit once to advance the version past what the stale op expects.
    let _ = server
        .store
        .apply(Operation::mutate(
            clan_id.clone(),
            version,
            "Clan",
            json!({"population": 50}),
        ))
        .await
        .unwrap();
    let _ = server.store.drain_applied().await;

    let stale = server
        .store
        .apply(Operation::mutate(
            clan_id.clone(),
            version,
            "Clan",
            json!({"population": 999}),
        ))
        .await;
    assert!(stale.is_err());

    // The rejected delta left nothing to broadcast.
    assert!(server.store.drain_applied().await.is_empty());
    assert_eq!(server.batcher.flush().await, 0);
}

#[tokio::test]
async fn console_lines_are_fanned_out() {
    let server = start_server().await;
    let mut client = timeout(STEP_TIMEOUT, SyncClient::connect(&server.base_url))
        .await
        .unwrap()
        .unwrap();

    let delivered = server
        .batcher
        .console("Clan Aelfen is wandering to 2, 3")
        .await;
    assert_eq!(delivered, 1);

    let event = timeout(STEP_TIMEOUT, client.next_event())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        event,
        ClientEvent::Console(String::from("Clan Aelfen is wandering to 2, 3"))
    );
}

#[tokio::test]
async fn resync_replaces_cache_with_fresh_snapshot() {
    let server = start_server().await;
    let mut client = timeout(STEP_TIMEOUT, SyncClient::connect(&server.base_url))
        .await
        .unwrap()
        .unwrap();

    let (clan_id, _version, _x, _y) = first_clan(&server.store).await;
    let _ = server
        .store
        .save_properties(&clan_id, json!({"population": 77}))
        .await
        .unwrap();
    // Deliberately do NOT flush the delta: the repeat sync command is the
    // only path by which the client can observe this change.
    let _ = server.store.drain_applied().await;

    let count = timeout(STEP_TIMEOUT, client.resync()).await.unwrap().unwrap();
    assert_eq!(count, server.store.entity_count().await);
    let cached = client.cache().get(&clan_id).unwrap();
    assert_eq!(cached.state.get("population").unwrap(), 77);
}

#[tokio::test]
async fn unknown_connection_id_discards_partial_session() {
    let server = start_server().await;

    let (mut update, _) = connect_async(format!("{}/update", server.base_url))
        .await
        .unwrap();
    update
        .send(Message::Text(
            json!({"connectionId": "ghost"}).to_string().into(),
        ))
        .await
        .unwrap();

    // The server closes without ever confirming the binding.
    let mut confirmed = false;
    while let Ok(Some(frame)) = timeout(STEP_TIMEOUT, update.next()).await {
        match frame {
            Ok(Message::Text(text)) => {
                confirmed = confirmed || text.as_str().contains("down_socket_confirm");
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }
    assert!(!confirmed, "server confirmed a binding for an unknown id");
}

#[tokio::test]
async fn malformed_command_does_not_close_the_socket() {
    let server = start_server().await;

    let (mut command, _) = connect_async(format!("{}/command", server.base_url))
        .await
        .unwrap();

    // connection_confirm arrives first.
    let first = timeout(STEP_TIMEOUT, command.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let Message::Text(text) = first else {
        panic!("expected a text frame, got {first:?}");
    };
    assert!(text.as_str().contains("connection_confirm"));

    // Garbage is logged server-side and skipped.
    command
        .send(Message::Text(String::from("not json").into()))
        .await
        .unwrap();

    // The same socket still serves a well-formed sync command.
    command
        .send(Message::Text(
            json!({"command": "sync", "timestamp": 0}).to_string().into(),
        ))
        .await
        .unwrap();
    let reply = timeout(STEP_TIMEOUT, command.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let Message::Text(text) = reply else {
        panic!("expected a text frame, got {reply:?}");
    };
    assert!(text.as_str().contains("\"type\":\"sync\""));
}
