//! Shared type definitions for the Weald simulation.
//!
//! This crate is the single source of truth for all types used across the
//! Weald workspace. Wire-facing types flow downstream to `TypeScript` via
//! `ts-rs` for the observing dashboard client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe string-id wrappers for entities and connections
//! - [`enums`] -- Turn phases, behaviors, terrain, cultures
//! - [`entity`] -- The entity record, projections, and the delta-merge rule
//! - [`operation`] -- Proposed mutations for the apply pipeline
//! - [`protocol`] -- Command/update channel wire messages

pub mod entity;
pub mod enums;
pub mod ids;
pub mod operation;
pub mod protocol;

// Re-export all public types at crate root for convenience.
pub use entity::{Entity, GameClock, ProjectionError, Vector2, merge_state_delta};
pub use enums::{Behavior, CultureGroup, Terrain, TurnPhase};
pub use ids::{ConnectionId, EntityId};
pub use operation::{Operation, OperationAction};
pub use protocol::{
    CommandReply, CommandRequest, ConsoleMessage, DeltaOp, DeltaRecord, SyncData, UpdateBind,
    UpdateFrame, UpdateMessage, UpdateRecord,
};
