//! Authoritative Simulation Tick
//!
//! One fixed-order step over the world. The order is load-bearing: inputs
//! are staged first so movement and combat act on this tick's intent, combat
//! resolves before pickups so a killing blow cancels the victim's pickup,
//! and respawns run last so a revived player stands still until their next
//! input arrives.

use std::collections::BTreeMap;

use crate::game::combat::{advance_projectiles, resolve_attacks};
use crate::game::events::GameEvent;
use crate::game::input::PlayerInput;
use crate::game::orb::{resolve_pickups, spawn_orbs};
use crate::game::state::{PlayerId, World, PLAYER_RADIUS, SPAWN_MARGIN};
use crate::MAX_TICK_DT;

/// Result of one tick.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Events generated this tick, in emission order
    pub events: Vec<GameEvent>,
}

/// Run one simulation tick.
///
/// * `inputs` - staged inputs drained from the mailbox, keyed by player
/// * `dt` - wall seconds since the previous tick; capped at [`MAX_TICK_DT`]
/// * `now_ms` - current monotonic clock reading
pub fn tick(
    world: &mut World,
    inputs: &BTreeMap<PlayerId, PlayerInput>,
    dt: f64,
    now_ms: u64,
) -> TickOutcome {
    let dt = dt.min(MAX_TICK_DT);

    // 1. Stage drained inputs onto their players
    stage_inputs(world, inputs);

    // 2. Integrate movement
    integrate_movement(world, dt);

    // 3. Resolve attacks (melee + projectile spawns)
    resolve_attacks(world, dt, now_ms);

    // 4. Advance projectiles and resolve their hits
    advance_projectiles(world, dt, now_ms);

    // 5. Orb pickups and leveling
    resolve_pickups(world);

    // 6. Top up the orb population
    spawn_orbs(world);

    // 7. Fire due respawns
    process_respawns(world, now_ms);

    TickOutcome {
        events: world.take_events(),
    }
}

/// Replace each player's held input with the staged frame and advance the
/// processed-sequence echo.
///
/// The echo never regresses: a stale frame that slips in behind a newer one
/// moves the input but keeps the higher sequence number.
fn stage_inputs(world: &mut World, inputs: &BTreeMap<PlayerId, PlayerInput>) {
    for (player_id, input) in inputs {
        if let Some(player) = world.players.get_mut(player_id) {
            player.last_input = *input;
            player.last_processed_seq = player.last_processed_seq.max(input.seq);
        }
    }
}

/// Apply held movement keys to every live player and clamp to the map.
fn integrate_movement(world: &mut World, dt: f64) {
    let (map_w, map_h) = (world.map_width, world.map_height);

    for player in world.players.values_mut() {
        if player.is_dead {
            continue;
        }

        let dir = player.last_input.direction();
        if dir == crate::core::vec2::Vec2::ZERO {
            continue;
        }

        // speed is per-tick at 60 Hz; the 60·dt factor keeps velocity stable
        // when the tick rate drifts
        player.pos = player.pos + dir.scale(player.stats.speed * 60.0 * dt);
        player.pos = player.pos.clamp_to(
            PLAYER_RADIUS,
            map_w - PLAYER_RADIUS,
            PLAYER_RADIUS,
            map_h - PLAYER_RADIUS,
        );
    }
}

/// Revive players whose respawn time has come.
///
/// The queue may reference players who disconnected while dead; those
/// entries are dropped on sight.
fn process_respawns(world: &mut World, now_ms: u64) {
    let due: Vec<PlayerId> = world
        .respawn_queue
        .iter()
        .filter(|entry| entry.due_ms <= now_ms)
        .map(|entry| entry.player_id)
        .collect();

    if due.is_empty() {
        return;
    }
    world.respawn_queue.retain(|entry| entry.due_ms > now_ms);

    for player_id in due {
        let pos = world
            .rng
            .position_with_margin(world.map_width, world.map_height, SPAWN_MARGIN);
        if let Some(player) = world.players.get_mut(&player_id) {
            if player.is_dead {
                player.respawn(pos);
                world.push_event(GameEvent::PlayerRespawned { player_id });
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
