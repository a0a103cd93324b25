//! Network Layer
//!
//! WebSocket frontend for the arena. Nothing in here mutates the world
//! directly; every change flows through the session's locks and the input
//! mailbox.

pub mod protocol;
pub mod server;
pub mod session;

pub use protocol::{ClientMessage, OrbView, PlayerView, ProjectileView, ServerMessage, WorldView};
pub use server::{GameServer, GameServerError, ServerConfig};
pub use session::{ArenaSession, ConnId};
