//! REST endpoint handlers for the world server.
//!
//! A minimal operator surface next to the sync gateway:
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/status` | Clock, pause, and session counters |
//! | `POST` | `/api/pause` | Pause the world |
//! | `POST` | `/api/resume` | Resume the world |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use serde::Serialize;
use weald_core::PauseSignal;
use weald_sync::SyncState;
use weald_types::{GameClock, TurnPhase};

use crate::store::MemoryStore;

/// Shared state for the REST handlers.
#[derive(Clone)]
pub struct AppState {
    /// The authoritative store.
    pub store: Arc<MemoryStore>,
    /// The global pause flag.
    pub pause: Arc<PauseSignal>,
    /// The sync gateway state (for session counters).
    pub sync: Arc<SyncState>,
}

/// JSON body of `GET /api/status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusBody {
    /// Current turn number.
    pub current_turn: u64,
    /// Phase the clock currently shows.
    pub turn_phase: TurnPhase,
    /// Whether a turn cycle is mid-processing.
    pub turn_processing: bool,
    /// Whether the world is paused.
    pub paused: bool,
    /// Total entities in the store.
    pub entities: usize,
    /// Live sessions (including mid-handshake ones).
    pub sessions: usize,
    /// Fully paired broadcast targets.
    pub paired_sessions: usize,
}

/// Serve a minimal HTML page showing server status and endpoints.
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let clock = state
        .store
        .game_clock()
        .await
        .map(|(_, clock)| clock)
        .unwrap_or_else(|_| GameClock::default());
    let paused = if state.pause.is_paused() {
        "PAUSED"
    } else {
        "RUNNING"
    };
    let entities = state.store.entity_count().await;
    let sessions = state.sync.registry.session_count().await;

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Weald</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 720px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; color: #8b949e; }}
    </style>
</head>
<body>
    <h1>Weald</h1>
    <p class="subtitle">Turn-based world server</p>

    <p>State: <span class="status">{paused}</span></p>

    <div>
        <div class="metric">
            <div class="label">Turn</div>
            <div class="value">{turn}</div>
        </div>
        <div class="metric">
            <div class="label">Phase</div>
            <div class="value">{phase}</div>
        </div>
        <div class="metric">
            <div class="label">Entities</div>
            <div class="value">{entities}</div>
        </div>
        <div class="metric">
            <div class="label">Sessions</div>
            <div class="value">{sessions}</div>
        </div>
    </div>

    <ul>
        <li>WS /command -- command channel</li>
        <li>WS /update -- update channel</li>
        <li>GET /api/status -- JSON status</li>
        <li>POST /api/pause, POST /api/resume -- clock control</li>
    </ul>
</body>
</html>"#,
        turn = clock.current_turn,
        phase = clock.turn_phase.as_str(),
    ))
}

/// `GET /api/status` -- clock, pause, and session counters.
pub async fn get_status(State(state): State<AppState>) -> Json<StatusBody> {
    let clock = state
        .store
        .game_clock()
        .await
        .map(|(_, clock)| clock)
        .unwrap_or_else(|_| GameClock::default());

    Json(StatusBody {
        current_turn: clock.current_turn,
        turn_phase: clock.turn_phase,
        turn_processing: clock.turn_processing,
        paused: state.pause.is_paused(),
        entities: state.store.entity_count().await,
        sessions: state.sync.registry.session_count().await,
        paired_sessions: state.sync.registry.bound_count().await,
    })
}

/// `POST /api/pause` -- pause the world clock.
///
/// An in-flight phase finishes; subsequent ticks are skipped until
/// resume.
pub async fn post_pause(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.pause.pause();
    Json(serde_json::json!({"paused": true}))
}

/// `POST /api/resume` -- resume the world clock.
pub async fn post_resume(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.pause.resume();
    Json(serde_json::json!({"paused": false}))
}
