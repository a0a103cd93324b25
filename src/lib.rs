//! # Orb Arena Game Server
//!
//! Authoritative real-time simulation for Orb Arena, a top-down multiplayer
//! arena game played over WebSockets.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ORB ARENA SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Domain-free primitives                    │
//! │  ├── vec2.rs     - 2D float vector math                      │
//! │  ├── rng.rs      - Seedable Xorshift128+ PRNG                │
//! │  └── clock.rs    - Monotonic millisecond clock               │
//! │                                                              │
//! │  game/           - Simulation (no I/O)                       │
//! │  ├── stats.rs    - Race/specialization stat table            │
//! │  ├── state.rs    - World, players, orbs, projectiles         │
//! │  ├── input.rs    - Sanitized input + latest-wins mailbox     │
//! │  ├── combat.rs   - Melee cones, projectiles, damage          │
//! │  ├── orb.rs      - Pickups, XP, orb spawner                  │
//! │  └── tick.rs     - Fixed-order tick over the world           │
//! │                                                              │
//! │  network/        - WebSocket frontend                        │
//! │  ├── protocol.rs - JSON frame schema                         │
//! │  ├── session.rs  - Connection lifecycle + arena session      │
//! │  └── server.rs   - Listener, connection tasks, tick loop     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authority Model
//!
//! The server is the single source of truth. Clients send intent (held keys,
//! aim coordinates, a monotonic input sequence number); the tick worker
//! integrates that intent at a fixed ~60 Hz, resolves combat and pickups, and
//! broadcasts one timestamped snapshot per tick. Each player payload echoes
//! the last input sequence the simulation consumed, which is what lets
//! clients reconcile local prediction against the authoritative state.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::core::clock::{Clock, ManualClock, SystemClock};
pub use crate::core::rng::GameRng;
pub use crate::core::vec2::Vec2;
pub use game::state::{Player, PlayerId, World};
pub use game::stats::{derive_stats, DerivedStats, Race, Specialization};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;

/// Target interval between ticks, in microseconds
pub const TICK_INTERVAL_US: u64 = 1_000_000 / TICK_RATE as u64;

/// Upper bound on the delta time fed to one tick, in seconds.
///
/// If the tick worker is starved by the OS, at most this much simulated time
/// is integrated in one step so entities never tunnel across the map.
pub const MAX_TICK_DT: f64 = 0.05;

/// Client-contract interpolation delay, in milliseconds.
///
/// Clients render remote entities this far in the past, between the two
/// snapshots that bracket the render time. The server does not act on this
/// value; it is part of the wire contract alongside the snapshot timestamp.
pub const INTERPOLATION_DELAY_MS: u64 = 100;
