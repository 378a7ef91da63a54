//! The dual-channel entity sync protocol for the Weald simulation.
//!
//! Server side: a two-socket gateway (command channel for requests and
//! full syncs, update channel for pushed deltas), connection pairings as
//! the unit of fan-out, and a per-frame delta batcher. Client side: the
//! handshake driver and the entity cache with the full-sync/delta-merge
//! reconciliation rules.
//!
//! # Modules
//!
//! - [`registry`] -- [`SessionRegistry`], the live connection pairings
//! - [`command`] -- command-channel `WebSocket` handler
//! - [`update`] -- update-channel `WebSocket` handler
//! - [`batcher`] -- [`UpdateBatcher`], per-frame delta coalescing + fan-out
//! - [`router`] -- axum route assembly
//! - [`state`] -- shared gateway state and the [`SnapshotSource`] seam
//! - [`cache`] -- [`EntityCache`], the client-side reconciler
//! - [`client`] -- [`SyncClient`], the observing client
//! - [`error`] -- [`SyncError`]

pub mod batcher;
pub mod cache;
pub mod client;
pub mod command;
pub mod error;
pub mod registry;
pub mod router;
pub mod state;
pub mod update;

// Re-export primary types at crate root.
pub use batcher::UpdateBatcher;
pub use cache::EntityCache;
pub use client::{ClientError, ClientEvent, SyncClient};
pub use error::SyncError;
pub use registry::SessionRegistry;
pub use router::build_sync_router;
pub use state::{SnapshotSource, SyncState};
