//! Core primitives shared by the simulation and the network layer.
//!
//! Nothing in this module knows about players, orbs, or WebSockets.

pub mod clock;
pub mod rng;
pub mod vec2;

// Re-export core types
pub use clock::{Clock, ManualClock, SystemClock};
pub use rng::GameRng;
pub use vec2::{normalize_angle, Vec2};
