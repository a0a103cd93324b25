//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every frame is a JSON object tagged by a `type` field.

use serde::{Deserialize, Serialize};

use crate::game::input::PlayerInput;
use crate::game::state::{
    Orb, Player, PlayerId, Projectile, World, ORB_RADIUS, PLAYER_RADIUS, PROJECTILE_RADIUS,
};
use crate::game::stats::{Race, Specialization};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Enter the arena with a display name and race.
    Join {
        /// Display name; the server truncates to 16 characters.
        #[serde(default)]
        name: String,
        /// Race name; anything unrecognized falls back to `human`.
        #[serde(default)]
        race: String,
    },

    /// Latest input state. Replaces, never queues.
    Input {
        /// The sanitized input payload
        input: PlayerInput,
    },

    /// Choose a level-2 specialization.
    SelectClass {
        /// Wire name of the chosen specialization
        choice: String,
    },

    /// Latency probe; echoed back as `pong`.
    Ping {
        /// Client timestamp, returned verbatim
        time: f64,
    },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Reply to a successful join.
    #[serde(rename_all = "camelCase")]
    Welcome {
        /// The joining player's id
        player_id: PlayerId,
        /// Map width in world units
        map_width: f64,
        /// Map height in world units
        map_height: f64,
        /// Complete world state at join time
        initial_state: WorldView,
    },

    /// Authoritative snapshot, broadcast every tick.
    GameState {
        /// Server clock at snapshot time, milliseconds
        timestamp: u64,
        /// All players, dead ones included with `isDead: true`
        players: Vec<PlayerView>,
        /// All orbs
        orbs: Vec<OrbView>,
        /// All projectiles in flight
        projectiles: Vec<ProjectileView>,
    },

    /// The receiving player reached level 2 and may pick a specialization.
    LevelUpReady {},

    /// Reply to an accepted `selectClass`.
    ClassSelected {
        /// The player's state after the specialization applied
        player: PlayerView,
    },

    /// Reply to `ping`.
    #[serde(rename_all = "camelCase")]
    Pong {
        /// The client timestamp from the `ping`
        client_time: f64,
    },
}

// =============================================================================
// VIEWS
// =============================================================================

/// Per-player snapshot payload.
///
/// Carries exactly what clients render and reconcile against; transport and
/// internal fields (inputs, cooldowns) are excluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// Player id
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Current HP
    pub hp: i32,
    /// Maximum HP
    pub max_hp: i32,
    /// Level (1 or 2)
    pub level: u8,
    /// Experience
    pub xp: u32,
    /// Race
    pub race: Race,
    /// Specialization, `null` until chosen
    pub class_or_mutation: Option<Specialization>,
    /// Body color
    pub color: String,
    /// Body radius
    pub radius: f64,
    /// Whether the player is currently dead
    pub is_dead: bool,
    /// Whether the player may currently pick a specialization
    pub can_choose_level2: bool,
    /// Echo of the last consumed input sequence, for reconciliation
    pub last_processed_input_seq: u64,
}

impl From<&Player> for PlayerView {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            x: p.pos.x,
            y: p.pos.y,
            hp: p.hp,
            max_hp: p.max_hp,
            level: p.level,
            xp: p.xp,
            race: p.race,
            class_or_mutation: p.specialization,
            color: p.color.clone(),
            radius: PLAYER_RADIUS,
            is_dead: p.is_dead,
            can_choose_level2: p.can_choose_specialization,
            last_processed_input_seq: p.last_processed_seq,
        }
    }
}

/// Per-orb snapshot payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbView {
    /// Orb id
    pub id: u32,
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Orb radius
    pub radius: f64,
    /// Display color
    pub color: String,
}

impl From<&Orb> for OrbView {
    fn from(o: &Orb) -> Self {
        Self {
            id: o.id,
            x: o.pos.x,
            y: o.pos.y,
            radius: ORB_RADIUS,
            color: o.color.clone(),
        }
    }
}

/// Per-projectile snapshot payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileView {
    /// Projectile id
    pub id: u32,
    /// Firing player's id (that player may have left the arena)
    pub owner_id: PlayerId,
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Projectile radius
    pub radius: f64,
    /// Display color
    pub color: String,
}

impl From<&Projectile> for ProjectileView {
    fn from(q: &Projectile) -> Self {
        Self {
            id: q.id,
            owner_id: q.owner,
            x: q.pos.x,
            y: q.pos.y,
            radius: PROJECTILE_RADIUS,
            color: q.color.clone(),
        }
    }
}

/// Complete world state, used for `welcome.initialState`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldView {
    /// All players
    pub players: Vec<PlayerView>,
    /// All orbs
    pub orbs: Vec<OrbView>,
    /// All projectiles
    pub projectiles: Vec<ProjectileView>,
}

impl WorldView {
    /// Snapshot the world into wire views.
    pub fn from_world(world: &World) -> Self {
        Self {
            players: world.players.values().map(PlayerView::from).collect(),
            orbs: world.orbs.values().map(OrbView::from).collect(),
            projectiles: world.projectiles.values().map(ProjectileView::from).collect(),
        }
    }
}

/// Build the per-tick `gameState` frame.
pub fn game_state_frame(world: &World, timestamp: u64) -> ServerMessage {
    let view = WorldView::from_world(world);
    ServerMessage::GameState {
        timestamp,
        players: view.players,
        orbs: view.orbs,
        projectiles: view.projectiles,
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

// =============================================================================
// TESTS
// =============================================================================
