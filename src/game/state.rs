//! World State
//!
//! All entity records and the shared world the tick worker owns.
//! Uses BTreeMap storage so iteration order is deterministic.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::rng::GameRng;
use crate::core::vec2::Vec2;
use crate::game::events::GameEvent;
use crate::game::input::PlayerInput;
use crate::game::stats::{derive_stats, player_color, DerivedStats, Race, Specialization};

// =============================================================================
// WORLD CONSTANTS (wire-stable)
// =============================================================================

/// Map width in world units.
pub const MAP_WIDTH: f64 = 2000.0;

/// Map height in world units.
pub const MAP_HEIGHT: f64 = 2000.0;

/// Player body radius.
pub const PLAYER_RADIUS: f64 = 15.0;

/// Orb radius.
pub const ORB_RADIUS: f64 = 5.0;

/// XP granted per orb.
pub const ORB_XP: u32 = 10;

/// Target orb population the spawner maintains.
pub const ORB_TARGET_POPULATION: usize = 150;

/// Per-tick probability of adding one orb when under population.
pub const ORB_SPAWN_CHANCE: f64 = 0.15;

/// Projectile radius.
pub const PROJECTILE_RADIUS: f64 = 5.0;

/// Base attack cooldown, divided by the attacker's speed modifier.
pub const ATTACK_COOLDOWN_MS: f64 = 500.0;

/// XP required to reach level 2.
pub const XP_TO_LEVEL_2: u32 = 100;

/// Cap on XP awarded for a kill.
pub const KILL_XP_CAP: u32 = 500;

/// Delay between death and respawn.
pub const RESPAWN_DELAY_MS: u64 = 5000;

/// Margin kept from map edges for spawn and respawn positions.
pub const SPAWN_MARGIN: f64 = 50.0;

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier.
///
/// Implements `Ord` for deterministic BTreeMap ordering; serializes as the
/// UUID string clients see on the wire.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Allocate a fresh random id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// PLAYER
// =============================================================================

/// Authoritative state of one player.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    /// Unique player ID
    pub id: PlayerId,

    /// Display name, at most 16 characters
    pub name: String,

    /// Race chosen at join
    pub race: Race,

    /// Level-2 specialization, if chosen
    pub specialization: Option<Specialization>,

    /// Position, always inside `[radius, map - radius]` on both axes
    pub pos: Vec2,

    /// Current HP
    pub hp: i32,

    /// Maximum HP
    pub max_hp: i32,

    /// Dead players stay in the world until respawn or disconnect
    pub is_dead: bool,

    /// Accumulated experience
    pub xp: u32,

    /// Level, 1 or 2
    pub level: u8,

    /// True once level 2 is reached and no specialization has been chosen yet.
    /// While set, orbs are ignored.
    pub can_choose_specialization: bool,

    /// Number of players killed
    pub kill_count: u32,

    /// Combat stats derived from race + specialization
    pub stats: DerivedStats,

    /// Milliseconds until the next attack is allowed
    pub attack_cooldown_ms: f64,

    /// Latest staged input; persists between frames until replaced
    pub last_input: PlayerInput,

    /// Sequence number of the last input the simulation consumed.
    /// Non-decreasing; echoed in every snapshot for reconciliation.
    pub last_processed_seq: u64,

    /// Body color, `#rrggbb`
    pub color: String,
}

impl Player {
    /// Create a freshly joined level-1 player.
    pub fn new(id: PlayerId, name: String, race: Race, pos: Vec2) -> Self {
        let stats = derive_stats(race, None);
        Self {
            id,
            name,
            race,
            specialization: None,
            pos,
            hp: stats.max_hp,
            max_hp: stats.max_hp,
            is_dead: false,
            xp: 0,
            level: 1,
            can_choose_specialization: false,
            kill_count: 0,
            stats,
            attack_cooldown_ms: 0.0,
            last_input: PlayerInput::default(),
            last_processed_seq: 0,
            color: player_color(race, None),
        }
    }

    /// Whether the player participates in movement, combat, and pickups.
    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.is_dead
    }

    /// Promote to level 2 if the XP threshold is met.
    ///
    /// Returns true when the player just became eligible to choose a
    /// specialization (the caller emits `levelUpReady` exactly then).
    pub fn try_level_up(&mut self) -> bool {
        if self.level == 1 && self.xp >= XP_TO_LEVEL_2 && !self.can_choose_specialization {
            self.level = 2;
            self.can_choose_specialization = true;
            true
        } else {
            false
        }
    }

    /// Apply a chosen specialization, preserving the current HP fraction.
    pub fn apply_specialization(&mut self, spec: Specialization) {
        let ratio = if self.max_hp > 0 {
            self.hp as f64 / self.max_hp as f64
        } else {
            1.0
        };

        self.specialization = Some(spec);
        self.can_choose_specialization = false;
        self.stats = derive_stats(self.race, Some(spec));
        self.max_hp = self.stats.max_hp;
        self.hp = ((self.max_hp as f64 * ratio).round() as i32).max(1);
        self.color = player_color(self.race, Some(spec));
    }

    /// Bring a dead player back at `pos` with base race stats.
    ///
    /// Level and specialization reset, XP is halved.
    pub fn respawn(&mut self, pos: Vec2) {
        self.specialization = None;
        self.stats = derive_stats(self.race, None);
        self.max_hp = self.stats.max_hp;
        self.hp = self.max_hp;
        self.is_dead = false;
        self.level = 1;
        self.can_choose_specialization = false;
        self.xp /= 2;
        self.pos = pos;
        self.attack_cooldown_ms = 0.0;
        self.last_input = PlayerInput::default();
        self.color = player_color(self.race, None);
    }
}

// =============================================================================
// ORB
// =============================================================================

/// A collectible orb.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Orb {
    /// Unique orb ID (monotonic counter)
    pub id: u32,

    /// Position in the map
    pub pos: Vec2,

    /// Display color, `#rrggbb`
    pub color: String,
}

// =============================================================================
// PROJECTILE
// =============================================================================

/// A projectile in flight.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Projectile {
    /// Unique projectile ID (monotonic counter)
    pub id: u32,

    /// Player that fired it. May have left the world; the projectile flies on.
    pub owner: PlayerId,

    /// Position
    pub pos: Vec2,

    /// Velocity, units per tick at the 60 Hz baseline
    pub velocity: Vec2,

    /// Damage applied on hit
    pub damage: f64,

    /// Remaining travel distance before expiry
    pub range_remaining: f64,

    /// Display color (the owner's at fire time)
    pub color: String,
}

/// A pending respawn, due-time based rather than tick-count based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespawnEntry {
    /// Clock time at which the respawn fires
    pub due_ms: u64,
    /// Player to revive; skipped if gone by then
    pub player_id: PlayerId,
}

// =============================================================================
// WORLD
// =============================================================================

/// The single shared arena world.
///
/// Mutated only by the tick worker and the (rare) join/leave/selectClass
/// handlers, all serialized behind one lock in the session layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct World {
    /// Map width
    pub map_width: f64,

    /// Map height
    pub map_height: f64,

    /// All players, including dead ones awaiting respawn
    pub players: BTreeMap<PlayerId, Player>,

    /// All orbs
    pub orbs: BTreeMap<u32, Orb>,

    /// All projectiles in flight
    pub projectiles: BTreeMap<u32, Projectile>,

    /// World RNG (seeded for reproducible tests)
    pub rng: GameRng,

    /// Pending respawns, scanned against the clock each tick
    pub respawn_queue: Vec<RespawnEntry>,

    /// Events generated this tick (drained by the caller)
    #[serde(skip)]
    pending_events: Vec<GameEvent>,

    next_orb_id: u32,
    next_projectile_id: u32,
}

impl World {
    /// Create an empty world with a seeded RNG.
    pub fn new(seed: u64) -> Self {
        Self {
            map_width: MAP_WIDTH,
            map_height: MAP_HEIGHT,
            players: BTreeMap::new(),
            orbs: BTreeMap::new(),
            projectiles: BTreeMap::new(),
            rng: GameRng::new(seed),
            respawn_queue: Vec::new(),
            pending_events: Vec::new(),
            next_orb_id: 0,
            next_projectile_id: 0,
        }
    }

    /// Add a player at a random position. Returns the allocated id.
    pub fn spawn_player(&mut self, name: String, race: Race) -> PlayerId {
        let id = PlayerId::random();
        let pos = self
            .rng
            .position_with_margin(self.map_width, self.map_height, SPAWN_MARGIN);
        self.players.insert(id, Player::new(id, name, race, pos));
        id
    }

    /// Remove a player on disconnect.
    ///
    /// Cancels any pending respawn. Projectiles the player owned are left in
    /// flight and expire naturally.
    pub fn remove_player(&mut self, id: &PlayerId) -> Option<Player> {
        self.respawn_queue.retain(|entry| entry.player_id != *id);
        self.players.remove(id)
    }

    /// Get a player by ID.
    pub fn get_player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    /// Get a player mutably by ID.
    pub fn get_player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    /// Insert a new orb. Returns its id.
    pub fn spawn_orb(&mut self, pos: Vec2, color: String) -> u32 {
        let id = self.next_orb_id;
        self.next_orb_id += 1;
        self.orbs.insert(id, Orb { id, pos, color });
        id
    }

    /// Insert a new projectile. Returns its id.
    pub fn spawn_projectile(
        &mut self,
        owner: PlayerId,
        pos: Vec2,
        velocity: Vec2,
        damage: f64,
        range: f64,
        color: String,
    ) -> u32 {
        let id = self.next_projectile_id;
        self.next_projectile_id += 1;
        self.projectiles.insert(
            id,
            Projectile {
                id,
                owner,
                pos,
                velocity,
                damage,
                range_remaining: range,
                color,
            },
        );
        id
    }

    /// Schedule a respawn for `player_id` at `due_ms`.
    pub fn schedule_respawn(&mut self, player_id: PlayerId, due_ms: u64) {
        self.respawn_queue.push(RespawnEntry { due_ms, player_id });
    }

    /// Push a game event for the network layer.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }
}

// =============================================================================
// TESTS
// =============================================================================
