//! Input Intake
//!
//! Sanitized client input and the per-player latest-wins mailbox the tick
//! worker drains. Inputs are never queued: a frame that arrives before the
//! next tick simply replaces the previous one, so the server always
//! integrates the client's latest intent.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::core::vec2::Vec2;
use crate::game::state::PlayerId;

/// One sanitized input record.
///
/// The wire payload comes from an untrusted client, so every field is
/// tolerant: booleans coerce from numbers and strings, aim coordinates fall
/// back to "absent" on garbage (the consumer substitutes the player's current
/// position), and missing fields default to neutral.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInput {
    /// Move up (decreasing y)
    #[serde(default, deserialize_with = "coerce_bool")]
    pub up: bool,
    /// Move down
    #[serde(default, deserialize_with = "coerce_bool")]
    pub down: bool,
    /// Move left
    #[serde(default, deserialize_with = "coerce_bool")]
    pub left: bool,
    /// Move right
    #[serde(default, deserialize_with = "coerce_bool")]
    pub right: bool,
    /// Attack held
    #[serde(default, deserialize_with = "coerce_bool")]
    pub attack: bool,
    /// Aim X in world space
    #[serde(default, deserialize_with = "coerce_coord")]
    pub mouse_x: Option<f64>,
    /// Aim Y in world space
    #[serde(default, deserialize_with = "coerce_coord")]
    pub mouse_y: Option<f64>,
    /// Client-side monotonic input sequence number
    #[serde(default)]
    pub seq: u64,
}

impl PlayerInput {
    /// Movement direction from the held keys, normalized.
    ///
    /// `up` decreases `y` (screen convention for a top-down arena).
    pub fn direction(&self) -> Vec2 {
        let mut dir = Vec2::ZERO;
        if self.up {
            dir.y -= 1.0;
        }
        if self.down {
            dir.y += 1.0;
        }
        if self.left {
            dir.x -= 1.0;
        }
        if self.right {
            dir.x += 1.0;
        }
        dir.normalize()
    }

    /// Aim point, falling back to the player's own position for a missing or
    /// unparseable coordinate.
    pub fn aim_or(&self, fallback: Vec2) -> Vec2 {
        Vec2 {
            x: self.mouse_x.filter(|v| v.is_finite()).unwrap_or(fallback.x),
            y: self.mouse_y.filter(|v| v.is_finite()).unwrap_or(fallback.y),
        }
    }

    /// Whether any movement key is held.
    pub fn has_movement(&self) -> bool {
        self.up || self.down || self.left || self.right
    }

    /// Release all movement keys (applied when the player dies).
    pub fn clear_movement(&mut self) {
        self.up = false;
        self.down = false;
        self.left = false;
        self.right = false;
    }
}

/// Accept `true`/`false`, numbers (non-zero is true), and `"true"`/`"false"`.
fn coerce_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct BoolVisitor;

    impl<'de> Visitor<'de> for BoolVisitor {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a boolean-like value")
        }

        fn visit_bool<E>(self, v: bool) -> Result<bool, E> {
            Ok(v)
        }

        fn visit_i64<E>(self, v: i64) -> Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_u64<E>(self, v: u64) -> Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_f64<E>(self, v: f64) -> Result<bool, E> {
            Ok(v != 0.0)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
            Ok(matches!(v, "true" | "1"))
        }

        fn visit_unit<E>(self) -> Result<bool, E> {
            Ok(false)
        }
    }

    deserializer.deserialize_any(BoolVisitor)
}

/// Accept numbers and numeric strings; anything else becomes `None`.
fn coerce_coord<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct CoordVisitor;

    impl<'de> Visitor<'de> for CoordVisitor {
        type Value = Option<f64>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a number-like value")
        }

        fn visit_i64<E>(self, v: i64) -> Result<Option<f64>, E> {
            Ok(Some(v as f64))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Option<f64>, E> {
            Ok(Some(v as f64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Option<f64>, E> {
            Ok(v.is_finite().then_some(v))
        }

        fn visit_str<E>(self, v: &str) -> Result<Option<f64>, E> {
            Ok(v.parse::<f64>().ok().filter(|v| v.is_finite()))
        }

        fn visit_unit<E>(self) -> Result<Option<f64>, E> {
            Ok(None)
        }

        fn visit_none<E>(self) -> Result<Option<f64>, E> {
            Ok(None)
        }

        fn visit_bool<E>(self, _: bool) -> Result<Option<f64>, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(CoordVisitor)
}

// =============================================================================
// INPUT MAILBOX
// =============================================================================

/// Per-player single-slot input register shared between connection tasks and
/// the tick worker.
///
/// Connection handlers `store` under a short lock and never touch the world;
/// the tick worker `drain`s all slots at the start of each tick. Storing
/// twice between ticks overwrites: latest intent wins.
#[derive(Debug, Default)]
pub struct InputMailbox {
    slots: Mutex<BTreeMap<PlayerId, PlayerInput>>,
}

impl InputMailbox {
    /// Create an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot for `player` with `input`.
    pub fn store(&self, player: PlayerId, input: PlayerInput) {
        self.lock().insert(player, input);
    }

    /// Take every staged input, leaving the mailbox empty.
    pub fn drain(&self) -> BTreeMap<PlayerId, PlayerInput> {
        std::mem::take(&mut *self.lock())
    }

    /// Drop the slot for a departing player.
    pub fn remove(&self, player: &PlayerId) {
        self.lock().remove(player);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PlayerId, PlayerInput>> {
        // A poisoned mailbox only ever holds plain-old-data; keep serving.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// TESTS
// =============================================================================
