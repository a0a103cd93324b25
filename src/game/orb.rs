//! Orb Pickups and Spawning
//!
//! Orbs are the XP currency of the arena. Pickup resolution, the level-up
//! gate, and the probabilistic population top-up all live here.

use crate::core::vec2::circles_overlap;
use crate::game::events::GameEvent;
use crate::game::state::{
    PlayerId, World, ORB_RADIUS, ORB_SPAWN_CHANCE, ORB_TARGET_POPULATION, ORB_XP, PLAYER_RADIUS,
};

/// Orb colors, picked at spawn time.
const ORB_PALETTE: [&str; 6] = [
    "#ffd447", "#7ce0ff", "#ff7ab8", "#9dff70", "#d2a0ff", "#ffa95e",
];

/// Resolve orb pickups for every live player.
///
/// A player who is waiting on a specialization choice ignores orbs entirely;
/// everyone else collects every orb they overlap, one at a time, stopping
/// early if a pickup pushes them into the choice gate.
pub fn resolve_pickups(world: &mut World) {
    let player_ids: Vec<PlayerId> = world.players.keys().copied().collect();

    for player_id in player_ids {
        let touched: Vec<u32> = {
            let Some(player) = world.players.get(&player_id) else {
                continue;
            };
            if player.is_dead || player.can_choose_specialization {
                continue;
            }

            world
                .orbs
                .values()
                .filter(|orb| circles_overlap(player.pos, PLAYER_RADIUS, orb.pos, ORB_RADIUS))
                .map(|orb| orb.id)
                .collect()
        };

        for orb_id in touched {
            let Some(player) = world.players.get_mut(&player_id) else {
                break;
            };
            // A pickup in this very loop may have opened the choice gate
            if player.can_choose_specialization {
                break;
            }

            world.orbs.remove(&orb_id);
            player.xp += ORB_XP;
            if player.try_level_up() {
                world.push_event(GameEvent::LevelUpReady { player_id });
            }
        }
    }
}

/// Probabilistic per-tick top-up: one orb with probability 0.15 while the
/// population is below target.
pub fn spawn_orbs(world: &mut World) {
    if world.orbs.len() < ORB_TARGET_POPULATION && world.rng.chance(ORB_SPAWN_CHANCE) {
        spawn_random_orb(world);
    }
}

/// Fill the world up to the full orb population (used at server startup so
/// the arena is stocked before the first player joins).
pub fn populate_orbs(world: &mut World) {
    while world.orbs.len() < ORB_TARGET_POPULATION {
        spawn_random_orb(world);
    }
}

fn spawn_random_orb(world: &mut World) {
    let pos = world
        .rng
        .position_with_margin(world.map_width, world.map_height, ORB_RADIUS);
    let color = world
        .rng
        .choose(&ORB_PALETTE)
        .copied()
        .unwrap_or(ORB_PALETTE[0])
        .to_string();
    world.spawn_orb(pos, color);
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::Vec2;
    use crate::game::state::Player;
    use crate::game::stats::Race;

    fn add_player(world: &mut World, x: f64, y: f64) -> PlayerId {
        let id = PlayerId::random();
        world
            .players
            .insert(id, Player::new(id, "p".into(), Race::Human, Vec2::new(x, y)));
        id
    }

    #[test]
    fn test_pickup_grants_xp_and_removes_orb() {
        let mut world = World::new(1);
        let player = add_player(&mut world, 100.0, 100.0);
        world.spawn_orb(Vec2::new(105.0, 100.0), "#ffd447".into());

        resolve_pickups(&mut world);

        assert!(world.orbs.is_empty());
        assert_eq!(world.players[&player].xp, ORB_XP);
    }

    #[test]
    fn test_pickup_requires_overlap() {
        let mut world = World::new(1);
        let player = add_player(&mut world, 100.0, 100.0);
        // Combined radii are exactly 20: touching, not overlapping
        world.spawn_orb(Vec2::new(120.0, 100.0), "#ffd447".into());

        resolve_pickups(&mut world);

        assert_eq!(world.orbs.len(), 1);
        assert_eq!(world.players[&player].xp, 0);
    }

    #[test]
    fn test_pickup_triggers_level_up_once() {
        let mut world = World::new(1);
        let player = add_player(&mut world, 100.0, 100.0);
        world.players.get_mut(&player).unwrap().xp = 90;
        world.spawn_orb(Vec2::new(105.0, 100.0), "#ffd447".into());

        resolve_pickups(&mut world);

        let p = &world.players[&player];
        assert_eq!(p.xp, 100);
        assert_eq!(p.level, 2);
        assert!(p.can_choose_specialization);
        assert_eq!(
            world.take_events(),
            vec![GameEvent::LevelUpReady { player_id: player }]
        );
    }

    #[test]
    fn test_choice_gate_blocks_pickup() {
        let mut world = World::new(1);
        let player = add_player(&mut world, 100.0, 100.0);
        {
            let p = world.players.get_mut(&player).unwrap();
            p.xp = 100;
            p.level = 2;
            p.can_choose_specialization = true;
        }
        world.spawn_orb(Vec2::new(105.0, 100.0), "#ffd447".into());

        resolve_pickups(&mut world);

        assert_eq!(world.orbs.len(), 1);
        assert_eq!(world.players[&player].xp, 100);
    }

    #[test]
    fn test_overlapping_orbs_stop_at_choice_gate() {
        let mut world = World::new(1);
        let player = add_player(&mut world, 100.0, 100.0);
        world.players.get_mut(&player).unwrap().xp = 90;
        world.spawn_orb(Vec2::new(103.0, 100.0), "#ffd447".into());
        world.spawn_orb(Vec2::new(97.0, 100.0), "#ffd447".into());

        resolve_pickups(&mut world);

        // The first pickup hits the threshold; the second orb stays put
        let p = &world.players[&player];
        assert_eq!(p.xp, 100);
        assert_eq!(world.orbs.len(), 1);
    }

    #[test]
    fn test_dead_players_ignore_orbs() {
        let mut world = World::new(1);
        let player = add_player(&mut world, 100.0, 100.0);
        world.players.get_mut(&player).unwrap().is_dead = true;
        world.players.get_mut(&player).unwrap().hp = 0;
        world.spawn_orb(Vec2::new(105.0, 100.0), "#ffd447".into());

        resolve_pickups(&mut world);

        assert_eq!(world.orbs.len(), 1);
    }

    #[test]
    fn test_populate_fills_to_target() {
        let mut world = World::new(42);
        populate_orbs(&mut world);
        assert_eq!(world.orbs.len(), ORB_TARGET_POPULATION);

        for orb in world.orbs.values() {
            assert!(orb.pos.x >= ORB_RADIUS && orb.pos.x <= world.map_width - ORB_RADIUS);
            assert!(orb.pos.y >= ORB_RADIUS && orb.pos.y <= world.map_height - ORB_RADIUS);
        }

        // Already full: a top-up tick never overshoots
        for _ in 0..100 {
            spawn_orbs(&mut world);
        }
        assert_eq!(world.orbs.len(), ORB_TARGET_POPULATION);
    }

    #[test]
    fn test_spawner_rate_is_probabilistic() {
        let mut world = World::new(7);
        let mut spawned = 0;
        for _ in 0..1000 {
            let before = world.orbs.len();
            spawn_orbs(&mut world);
            spawned += world.orbs.len() - before;
            // Keep the population below target so the coin keeps flipping
            world.orbs.clear();
        }

        // ~150 expected at p = 0.15; a seeded run is exact but this bound
        // holds for any reasonable seed
        assert!((100..=200).contains(&spawned), "spawned {spawned}");
    }
}
