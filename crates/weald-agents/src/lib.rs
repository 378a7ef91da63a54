//! The clan behavior engine for the Weald simulation.
//!
//! Clans are autonomous agents: during ACT each clan chooses a behavior,
//! and during EXECUTE it carries the behavior out by consulting the map
//! cache and queueing a movement operation. Each clan's operation targets
//! its own entity and reads a read-only map snapshot, so clans can be
//! processed concurrently within a phase.
//!
//! # Modules
//!
//! - [`clan`] -- [`ClanView`], the typed projection of clan entities
//! - [`behavior`] -- the decide/act cycle
//! - [`console`] -- best-effort narration seam
//! - [`error`] -- [`AgentError`]

pub mod behavior;
pub mod clan;
pub mod console;
pub mod error;

// Re-export primary types at crate root.
pub use behavior::{choose_behavior, pick_wander_destination, queue_wander_action};
pub use clan::{CLAN_TYPE, ClanView};
pub use console::{ConsoleSink, NullConsole};
pub use error::AgentError;
