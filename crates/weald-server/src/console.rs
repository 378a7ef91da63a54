//! Bridges clan narration to the sync gateway's update channels.

use std::sync::Arc;

use async_trait::async_trait;
use weald_agents::ConsoleSink;
use weald_sync::UpdateBatcher;

/// [`ConsoleSink`] implementation that fans console lines out through the
/// update batcher.
#[derive(Debug)]
pub struct ConsoleRelay {
    /// Target batcher.
    batcher: Arc<UpdateBatcher>,
}

impl ConsoleRelay {
    /// Create a relay over the given batcher.
    pub const fn new(batcher: Arc<UpdateBatcher>) -> Self {
        Self { batcher }
    }
}

#[async_trait]
impl ConsoleSink for ConsoleRelay {
    async fn broadcast_console(&self, message: &str) {
        // Fan-out failures already pruned and logged the dead session;
        // narration is best-effort by contract.
        let _ = self.batcher.console(message).await;
    }
}
