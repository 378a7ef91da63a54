//! The global pause flag, shared between the orchestrator, agents, and
//! operator controls.
//!
//! Reads are lock-free atomic loads on the hot path (every orchestrator
//! tick and every agent decision); writes publish the new value on a
//! [`watch`] channel so interested tasks can react to the change without
//! polling. Readers never block writers.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

/// Shared, externally settable pause state with change notification.
#[derive(Debug)]
pub struct PauseSignal {
    /// Current value, for lock-free reads.
    paused: AtomicBool,

    /// Publishes every change for subscribers.
    tx: watch::Sender<bool>,
}

impl PauseSignal {
    /// Create a pause signal in the given initial state.
    pub fn new(initially_paused: bool) -> Self {
        let (tx, _) = watch::channel(initially_paused);
        Self {
            paused: AtomicBool::new(initially_paused),
            tx,
        }
    }

    /// Check whether the world is paused. Never blocks.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Set the pause state and publish the change to subscribers.
    ///
    /// Pausing does not interrupt an in-flight phase action; the
    /// orchestrator checks this flag at phase boundaries.
    pub fn set(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
        let _ = self.tx.send_replace(paused);
    }

    /// Pause the world.
    pub fn pause(&self) {
        self.set(true);
    }

    /// Resume the world.
    pub fn resume(&self) {
        self.set(false);
    }

    /// Subscribe to pause-state changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for PauseSignal {
    fn default() -> Self {
        Self::new(false)
    }
}
