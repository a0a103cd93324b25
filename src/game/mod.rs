//! Game Simulation
//!
//! Everything that mutates the world lives here, and none of it does I/O.
//! The network layer drives [`tick::tick`] and routes the resulting events.
//!
//! ## Module Structure
//!
//! - `stats`: pure race/specialization stat derivation
//! - `state`: world, players, orbs, projectiles, respawn queue
//! - `input`: sanitized client input + latest-wins mailbox
//! - `combat`: melee cones, projectiles, the damage pipeline
//! - `orb`: pickups, XP, the orb spawner
//! - `tick`: the fixed-order simulation step
//! - `events`: events the tick hands to the network layer

pub mod combat;
pub mod events;
pub mod input;
pub mod orb;
pub mod stats;
pub mod state;
pub mod tick;

// Re-export key types
pub use events::GameEvent;
pub use input::{InputMailbox, PlayerInput};
pub use state::{Orb, Player, PlayerId, Projectile, World};
pub use stats::{derive_stats, DerivedStats, Race, Specialization};
pub use tick::{tick, TickOutcome};
