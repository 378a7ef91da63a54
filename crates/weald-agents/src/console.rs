//! Best-effort human-readable broadcasts.
//!
//! Wander moves are narrated to connected clients as `{console: ...}`
//! frames. Narration is strictly best-effort: a sink failure is the
//! sink's problem to log, never the acting clan's.

use async_trait::async_trait;

/// Outbound seam for console narration.
///
/// The sync gateway implements this by fanning the message out to every
/// paired client's update channel; tests use a recording stub.
#[async_trait]
pub trait ConsoleSink: Send + Sync {
    /// Broadcast a console line to all connected clients.
    ///
    /// Implementations must swallow and log their own failures; callers
    /// ignore the outcome by design of the protocol, so there is nothing
    /// to return.
    async fn broadcast_console(&self, message: &str);
}

/// A sink that drops everything; used when no gateway is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullConsole;

#[async_trait]
impl ConsoleSink for NullConsole {
    async fn broadcast_console(&self, _message: &str) {}
}
