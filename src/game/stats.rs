//! Race and Specialization Stat Table
//!
//! Pure derivation of combat stats from a player's race and chosen
//! specialization. Base race effects apply first, then the specialization
//! overrides; a respawn drops the specialization and falls back to the bare
//! race row.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Baseline movement speed (units per tick at 60 Hz).
pub const BASE_SPEED: f64 = 2.5;

/// Baseline maximum HP.
pub const BASE_MAX_HP: f64 = 100.0;

/// Baseline attack damage.
pub const BASE_DAMAGE: f64 = 10.0;

/// Baseline melee reach: 2.5 player radii.
pub const MELEE_BASE_RANGE: f64 = 37.5;

/// Baseline projectile speed (units per tick at 60 Hz).
pub const BASE_PROJECTILE_SPEED: f64 = 7.0;

/// Baseline melee arc width in radians.
pub const BASE_MELEE_ARC: f64 = PI / 4.0;

/// An attack whose range exceeds this is resolved as a projectile.
pub const RANGED_THRESHOLD: f64 = MELEE_BASE_RANGE * 1.2;

// =============================================================================
// RACE
// =============================================================================

/// Player race, chosen at join time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Race {
    /// Baseline stats
    Human,
    /// Faster
    Elf,
    /// Tougher
    Gnome,
    /// Innate lifesteal
    Vampire,
    /// Fast but frail
    Goblin,
}

impl Race {
    /// All races, in wire order.
    pub const ALL: [Race; 5] = [
        Race::Human,
        Race::Elf,
        Race::Gnome,
        Race::Vampire,
        Race::Goblin,
    ];

    /// Parse a wire string; anything unrecognized is `Human`.
    pub fn parse_or_default(s: &str) -> Race {
        match s {
            "elf" => Race::Elf,
            "gnome" => Race::Gnome,
            "vampire" => Race::Vampire,
            "goblin" => Race::Goblin,
            _ => Race::Human,
        }
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Race::Human => "human",
            Race::Elf => "elf",
            Race::Gnome => "gnome",
            Race::Vampire => "vampire",
            Race::Goblin => "goblin",
        }
    }

    /// Base body color for this race (`#rrggbb`).
    pub fn base_color(self) -> &'static str {
        match self {
            Race::Human => "#d9a066",
            Race::Elf => "#3ca370",
            Race::Gnome => "#8e6fc7",
            Race::Vampire => "#b03a48",
            Race::Goblin => "#7f9b3a",
        }
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// SPECIALIZATION
// =============================================================================

/// Level-2 class or mutation. Rewrites combat stats on top of the race row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Specialization {
    /// Heavy melee
    Warrior,
    /// Ranged caster
    Mage,
    /// Melee with lifesteal
    Lord,
    /// Fast, rapid melee
    Higher,
    /// Wide, hard-hitting melee
    King,
    /// Brutal but slow melee
    Hobgoblin,
}

impl Specialization {
    /// Parse a wire string.
    pub fn parse(s: &str) -> Option<Specialization> {
        match s {
            "warrior" => Some(Specialization::Warrior),
            "mage" => Some(Specialization::Mage),
            "lord" => Some(Specialization::Lord),
            "higher" => Some(Specialization::Higher),
            "king" => Some(Specialization::King),
            "hobgoblin" => Some(Specialization::Hobgoblin),
            _ => None,
        }
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Specialization::Warrior => "warrior",
            Specialization::Mage => "mage",
            Specialization::Lord => "lord",
            Specialization::Higher => "higher",
            Specialization::King => "king",
            Specialization::Hobgoblin => "hobgoblin",
        }
    }

    /// Brightness factor applied to the race color.
    fn shade_factor(self) -> f64 {
        match self {
            Specialization::Warrior => 0.85,
            Specialization::Mage => 1.2,
            Specialization::Lord => 0.75,
            Specialization::Higher => 1.1,
            Specialization::King => 0.65,
            Specialization::Hobgoblin => 0.9,
        }
    }
}

impl fmt::Display for Specialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// DERIVED STATS
// =============================================================================

/// Combat stats derived from `(race, specialization)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DerivedStats {
    /// Movement speed, units per tick at the 60 Hz baseline
    pub speed: f64,
    /// Maximum HP
    pub max_hp: i32,
    /// Damage per hit
    pub damage: f64,
    /// Attack reach; beyond [`RANGED_THRESHOLD`] attacks fire projectiles
    pub range: f64,
    /// Melee cone width in radians
    pub melee_arc: f64,
    /// Projectile speed, units per tick at the 60 Hz baseline
    pub projectile_speed: f64,
    /// Divides the 500 ms cooldown: higher is faster
    pub attack_speed_mod: f64,
    /// Fraction of dealt damage returned as healing
    pub lifesteal: f64,
}

impl DerivedStats {
    /// Whether attacks are resolved as projectiles.
    #[inline]
    pub fn is_ranged(&self) -> bool {
        self.range > RANGED_THRESHOLD
    }
}

/// Derive combat stats for a race and optional specialization.
///
/// Level-1 players (no specialization) fight with a degraded melee swing:
/// 70% reach, 5 damage, narrow π/5 arc.
pub fn derive_stats(race: Race, specialization: Option<Specialization>) -> DerivedStats {
    let mut speed = BASE_SPEED;
    let mut max_hp = BASE_MAX_HP;
    let mut damage = BASE_DAMAGE;
    let mut range = MELEE_BASE_RANGE;
    let mut melee_arc = BASE_MELEE_ARC;
    let mut attack_speed_mod = 1.0;
    let mut lifesteal = 0.0;

    // Race row
    match race {
        Race::Human => {}
        Race::Elf => speed *= 1.1,
        Race::Gnome => max_hp *= 1.1,
        Race::Vampire => lifesteal = 0.02,
        Race::Goblin => {
            speed *= 1.05;
            max_hp *= 0.9;
        }
    }

    // Specialization row
    match specialization {
        None => {
            range = MELEE_BASE_RANGE * 0.7;
            damage = 5.0;
            melee_arc = PI / 5.0;
        }
        Some(Specialization::Warrior) => {
            max_hp *= 1.3;
            damage = 15.0;
            melee_arc = PI / 3.5;
        }
        Some(Specialization::Mage) => {
            max_hp *= 0.9;
            damage = 10.0;
            range = 400.0;
            attack_speed_mod = 0.8;
        }
        Some(Specialization::Lord) => {
            max_hp *= 1.1;
            damage = 12.0;
            range = MELEE_BASE_RANGE * 1.1;
            lifesteal = 0.10;
        }
        Some(Specialization::Higher) => {
            speed *= 1.2;
            damage = 10.0;
            melee_arc = PI / 4.5;
            attack_speed_mod = 0.7;
            lifesteal = 0.05;
        }
        Some(Specialization::King) => {
            max_hp *= 1.4;
            damage = 13.0;
            range = MELEE_BASE_RANGE * 0.9;
            melee_arc = PI / 3.0;
        }
        Some(Specialization::Hobgoblin) => {
            max_hp *= 1.2;
            speed *= 0.85;
            damage = 20.0;
            range = MELEE_BASE_RANGE * 1.1;
            attack_speed_mod = 1.2;
        }
    }

    DerivedStats {
        speed,
        max_hp: max_hp.round() as i32,
        damage,
        range,
        melee_arc,
        projectile_speed: BASE_PROJECTILE_SPEED,
        attack_speed_mod,
        lifesteal,
    }
}

/// Body color for a race shaded by its specialization (`#rrggbb`).
pub fn player_color(race: Race, specialization: Option<Specialization>) -> String {
    let base = race.base_color();
    match specialization {
        None => base.to_string(),
        Some(spec) => shade_hex(base, spec.shade_factor()),
    }
}

/// Multiply each channel of a `#rrggbb` color by `factor`, clamped.
fn shade_hex(hex: &str, factor: f64) -> String {
    let parse = |s: &str| u8::from_str_radix(s, 16).unwrap_or(0);
    let bytes = hex.as_bytes();
    if bytes.len() != 7 || bytes[0] != b'#' {
        return hex.to_string();
    }
    let r = parse(&hex[1..3]) as f64;
    let g = parse(&hex[3..5]) as f64;
    let b = parse(&hex[5..7]) as f64;
    let clamp = |c: f64| (c * factor).round().clamp(0.0, 255.0) as u8;
    format!("#{:02x}{:02x}{:02x}", clamp(r), clamp(g), clamp(b))
}

// =============================================================================
// TESTS
// =============================================================================
