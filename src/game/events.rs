//! Game Events
//!
//! Events generated during a tick for the network layer to route to
//! individual connections or log. The simulation itself never does I/O.

use serde::{Deserialize, Serialize};

use crate::game::state::PlayerId;

/// An event produced by the simulation during one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Player reached level 2 and may now choose a specialization.
    /// Routed to that player's connection as a `levelUpReady` frame.
    LevelUpReady {
        /// The newly eligible player
        player_id: PlayerId,
    },

    /// A player was killed.
    PlayerKilled {
        /// The player that died
        victim: PlayerId,
        /// The killer, if still present in the world
        killer: Option<PlayerId>,
    },

    /// A dead player came back to life.
    PlayerRespawned {
        /// The revived player
        player_id: PlayerId,
    },
}
