//! Combat Resolver
//!
//! Melee cone sweeps, projectile spawning and flight, and the shared damage
//! pipeline (lifesteal, death, kill XP, respawn scheduling).

use crate::core::vec2::{circles_overlap, normalize_angle, Vec2};
use crate::game::events::GameEvent;
use crate::game::state::{
    PlayerId, World, ATTACK_COOLDOWN_MS, KILL_XP_CAP, PLAYER_RADIUS, PROJECTILE_RADIUS,
    RESPAWN_DELAY_MS,
};

/// Gap between a shooter's body and a freshly spawned projectile.
const MUZZLE_GAP: f64 = 1.0;

/// Decrement cooldowns and trigger attacks for every live player holding
/// the attack key.
///
/// Melee swings are multi-target: one swing damages every other living
/// player inside reach and arc, in player-id order. Ranged attackers spawn
/// one projectile per trigger instead.
pub fn resolve_attacks(world: &mut World, dt: f64, now_ms: u64) {
    let ids: Vec<PlayerId> = world.players.keys().copied().collect();

    for id in ids {
        let (pos, stats, aim) = {
            let Some(player) = world.players.get_mut(&id) else {
                continue;
            };
            if player.is_dead {
                continue;
            }

            player.attack_cooldown_ms = (player.attack_cooldown_ms - dt * 1000.0).max(0.0);
            if !(player.last_input.attack && player.attack_cooldown_ms <= 0.0) {
                continue;
            }
            player.attack_cooldown_ms = ATTACK_COOLDOWN_MS / player.stats.attack_speed_mod;

            let aim = player.last_input.aim_or(player.pos);
            (player.pos, player.stats, aim)
        };

        let attack_angle = pos.angle_to(aim);

        if stats.is_ranged() {
            fire_projectile(world, id, pos, attack_angle, &stats);
        } else {
            melee_sweep(world, id, pos, attack_angle, &stats, now_ms);
        }
    }
}

fn fire_projectile(
    world: &mut World,
    shooter: PlayerId,
    pos: Vec2,
    angle: f64,
    stats: &crate::game::stats::DerivedStats,
) {
    let dir = Vec2::from_angle(angle);
    let spawn_pos = pos + dir.scale(PLAYER_RADIUS + PROJECTILE_RADIUS + MUZZLE_GAP);
    let color = world
        .players
        .get(&shooter)
        .map(|p| p.color.clone())
        .unwrap_or_default();

    world.spawn_projectile(
        shooter,
        spawn_pos,
        dir.scale(stats.projectile_speed),
        stats.damage,
        stats.range,
        color,
    );
}

fn melee_sweep(
    world: &mut World,
    attacker: PlayerId,
    pos: Vec2,
    attack_angle: f64,
    stats: &crate::game::stats::DerivedStats,
    now_ms: u64,
) {
    let reach = stats.range + PLAYER_RADIUS;
    let half_arc = stats.melee_arc / 2.0;

    let victims: Vec<PlayerId> = world
        .players
        .iter()
        .filter(|(id, target)| {
            **id != attacker
                && target.is_alive()
                && pos.distance(target.pos) < reach
                && normalize_angle(attack_angle - pos.angle_to(target.pos)).abs() < half_arc
        })
        .map(|(id, _)| *id)
        .collect();

    for victim in victims {
        apply_damage(world, attacker, victim, stats.damage, now_ms);
    }
}

/// Advance every projectile, expire the spent ones, and resolve hits.
///
/// A projectile dies on the first of: range exhausted, off the map, or a hit
/// on a living non-owner player. The first overlapping player in id order
/// takes the hit.
pub fn advance_projectiles(world: &mut World, dt: f64, now_ms: u64) {
    let scale = dt * 60.0;
    let ids: Vec<u32> = world.projectiles.keys().copied().collect();

    for id in ids {
        let (pos, owner, damage) = {
            let Some(proj) = world.projectiles.get_mut(&id) else {
                continue;
            };

            let step = proj.velocity.scale(scale);
            proj.pos = proj.pos + step;
            proj.range_remaining -= step.length();

            let off_map = proj.pos.x < 0.0
                || proj.pos.x > world.map_width
                || proj.pos.y < 0.0
                || proj.pos.y > world.map_height;
            if proj.range_remaining <= 0.0 || off_map {
                world.projectiles.remove(&id);
                continue;
            }

            (proj.pos, proj.owner, proj.damage)
        };

        let hit = world
            .players
            .iter()
            .find(|(pid, target)| {
                **pid != owner
                    && target.is_alive()
                    && circles_overlap(pos, PROJECTILE_RADIUS, target.pos, PLAYER_RADIUS)
            })
            .map(|(pid, _)| *pid);

        if let Some(target) = hit {
            world.projectiles.remove(&id);
            apply_damage(world, owner, target, damage, now_ms);
        }
    }
}

/// Shared damage pipeline.
///
/// Subtracts rounded damage from the target, heals a lifestealing dealer,
/// and on a kill: marks the victim dead, awards the dealer XP and a kill,
/// and schedules the victim's respawn.
pub fn apply_damage(world: &mut World, dealer: PlayerId, target: PlayerId, damage: f64, now_ms: u64) {
    let (killed, victim_xp) = {
        let Some(victim) = world.players.get_mut(&target) else {
            return;
        };
        if victim.is_dead {
            return;
        }

        victim.hp -= damage.round() as i32;
        if victim.hp <= 0 {
            victim.hp = 0;
            victim.is_dead = true;
            victim.last_input.clear_movement();
            (true, victim.xp)
        } else {
            (false, 0)
        }
    };

    // Lifesteal, under a separate borrow; the dealer may be gone or dead.
    if let Some(p) = world.players.get_mut(&dealer) {
        if p.is_alive() && p.stats.lifesteal > 0.0 {
            let heal = ((damage * p.stats.lifesteal).round() as i32).max(1);
            p.hp = (p.hp + heal).min(p.max_hp);
        }
    }

    if killed {
        let mut dealer_present = false;
        if let Some(p) = world.players.get_mut(&dealer) {
            if p.is_alive() {
                p.xp += (victim_xp / 2 + 50).min(KILL_XP_CAP);
                p.kill_count += 1;
                if p.try_level_up() {
                    world.push_event(GameEvent::LevelUpReady { player_id: dealer });
                }
            }
            dealer_present = true;
        }

        world.push_event(GameEvent::PlayerKilled {
            victim: target,
            killer: dealer_present.then_some(dealer),
        });
        world.schedule_respawn(target, now_ms + RESPAWN_DELAY_MS);
    }
}

// =============================================================================
// TESTS
// =============================================================================
