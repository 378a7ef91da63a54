//! The Weald world server: turn loop, in-memory authoritative store, and
//! sync gateway wiring.
//!
//! The binary in `main.rs` assembles these pieces; they are exposed as a
//! library so integration tests can run a full in-process server.
//!
//! # Modules
//!
//! - [`store`] -- [`MemoryStore`], the reference apply pipeline
//! - [`seed`] -- deterministic terrain/clock/clan generation
//! - [`phases`] -- the four phase actions (ACT/EXECUTE/RESOLVE/TURN_END)
//! - [`scheduler`] -- the fixed-rate frame driver
//! - [`console`] -- narration relay into the update channels
//! - [`events`] -- best-effort NATS turn-lifecycle events
//! - [`handlers`] / [`router`] -- REST surface and router assembly

pub mod console;
pub mod events;
pub mod handlers;
pub mod phases;
pub mod router;
pub mod scheduler;
pub mod seed;
pub mod store;

// Re-export primary types at crate root.
pub use console::ConsoleRelay;
pub use events::TurnEvents;
pub use handlers::AppState;
pub use phases::{PhaseContext, register_phases};
pub use router::build_router;
pub use scheduler::run_frame_loop;
pub use seed::{SeedSummary, seed_world};
pub use store::MemoryStore;
