//! Turn orchestration and control plane for the Weald simulation.
//!
//! This crate owns the looping phase state machine that gates when agents
//! may act, the global pause flag, the operation queue client, and the
//! trait seams to the external entity store and apply pipeline.
//!
//! # Modules
//!
//! - [`orchestrator`] -- [`TurnOrchestrator`], the `advance-if-idle` phase
//!   state machine driven by an external fixed-rate tick
//! - [`pause`] -- [`PauseSignal`], lock-free reads with publish-on-set
//! - [`ops`] -- [`OperationQueue`], the producer client for the apply
//!   pipeline
//! - [`store`] -- async trait seams to the external store
//! - [`config`] -- YAML configuration with defaults

pub mod config;
pub mod ops;
pub mod orchestrator;
pub mod pause;
pub mod store;

// Re-export primary types at crate root.
pub use config::{ConfigError, SimulationConfig};
pub use ops::{OperationQueue, QueueError, QueueOutcome, QueueStats};
pub use orchestrator::{PhaseAction, PhaseError, TickOutcome, TurnOrchestrator};
pub use pause::PauseSignal;
pub use store::{Applied, ApplyError, ApplyPipeline, EntityWriter, StateStore, StoreError};
