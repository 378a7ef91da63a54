//! The fixed-rate frame driver.
//!
//! A single external scheduler ticks the orchestrator once per frame and
//! flushes the sync batcher afterwards. The orchestrator itself enforces
//! single-flight phase execution, so a frame that arrives while a phase
//! is still running is simply a no-op tick. The loop runs for the
//! lifetime of the process; pausing skips ticks without stopping frames.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use weald_core::TurnOrchestrator;
use weald_sync::UpdateBatcher;

use crate::store::MemoryStore;

/// Drive the orchestrator at a fixed frame rate, forever.
///
/// After every tick the deltas committed during the frame are staged and
/// flushed to all paired clients as one `update_batch`.
pub async fn run_frame_loop(
    mut orchestrator: TurnOrchestrator,
    store: Arc<MemoryStore>,
    batcher: Arc<UpdateBatcher>,
    frame_interval_ms: u64,
) {
    let mut interval = tokio::time::interval(Duration::from_millis(frame_interval_ms.max(1)));
    info!(frame_interval_ms, "frame loop started");

    loop {
        interval.tick().await;
        let _ = orchestrator.tick().await;

        let committed = store.drain_applied().await;
        for applied in &committed {
            batcher.stage(applied).await;
        }
        let _ = batcher.flush().await;
    }
}
