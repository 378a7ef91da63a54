//! Turn-lifecycle event publication over NATS.
//!
//! Publication is strictly best-effort observability: a missing or
//! unreachable NATS server degrades to a debug log and the turn loop
//! never notices.

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

/// Subject for turn-complete events.
pub const SUBJECT_TURN_COMPLETE: &str = "weald.turn.complete";

/// Publisher for turn-lifecycle events.
pub struct TurnEvents {
    /// Connected client, or `None` when publication is disabled.
    client: Option<async_nats::Client>,
}

impl core::fmt::Debug for TurnEvents {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TurnEvents")
            .field("enabled", &self.client.is_some())
            .finish()
    }
}

impl TurnEvents {
    /// Connect to NATS if a URL is configured. Connection failures are
    /// logged and publication is disabled for the run.
    pub async fn connect(nats_url: Option<&str>) -> Self {
        let Some(url) = nats_url else {
            debug!("no NATS URL configured, turn events disabled");
            return Self { client: None };
        };

        match async_nats::connect(url).await {
            Ok(client) => {
                info!(url, "turn event publisher connected");
                Self {
                    client: Some(client),
                }
            }
            Err(e) => {
                warn!(url, error = %e, "NATS connect failed, turn events disabled");
                Self { client: None }
            }
        }
    }

    /// A publisher that never publishes; used in tests.
    pub const fn disabled() -> Self {
        Self { client: None }
    }

    /// Publish a turn-complete event. Best-effort: failures are logged
    /// and swallowed.
    pub async fn publish_turn_complete(&self, turn: u64, clan_count: usize) {
        let Some(client) = &self.client else {
            debug!(turn, "turn event skipped (publisher disabled)");
            return;
        };

        let payload = json!({
            "turn": turn,
            "clans": clan_count,
            "completedAt": Utc::now().to_rfc3339(),
        });

        if let Err(e) = client
            .publish(SUBJECT_TURN_COMPLETE, payload.to_string().into())
            .await
        {
            warn!(turn, error = %e, "turn event publish failed");
        }
    }
}
