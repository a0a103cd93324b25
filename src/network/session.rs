//! Arena Session
//!
//! The one global arena: connection lifecycle, the shared world behind its
//! lock, snapshot fan-out, and routing of tick events back to individual
//! connections.
//!
//! Locking discipline: the tick worker takes the only per-tick world write
//! lock; join / selectClass / disconnect serialize through the same lock but
//! are rare. Input frames bypass the world entirely and land in the
//! [`InputMailbox`], which the tick worker drains at the start of each tick.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::core::clock::Clock;
use crate::game::events::GameEvent;
use crate::game::input::InputMailbox;
use crate::game::orb::populate_orbs;
use crate::game::state::{PlayerId, World};
use crate::game::stats::{Race, Specialization};
use crate::game::tick::tick;
use crate::network::protocol::{game_state_frame, ClientMessage, PlayerView, ServerMessage, WorldView};

/// Maximum display name length, in characters.
const MAX_NAME_LEN: usize = 16;

/// Connection identifier, allocated per accepted socket.
pub type ConnId = u64;

/// One connected client.
///
/// `player` is the connection's lifecycle state: `None` is PENDING (only
/// `join` is honored), `Some` is JOINED. Removal from the registry is
/// DISCONNECTED.
#[derive(Debug)]
struct ClientConn {
    /// The player this connection controls, once joined.
    player: Option<PlayerId>,
    /// Outbound queue of pre-serialized frames.
    sender: mpsc::Sender<String>,
}

/// The global arena session.
pub struct ArenaSession {
    world: RwLock<World>,
    clients: RwLock<BTreeMap<ConnId, ClientConn>>,
    inbox: InputMailbox,
    clock: Arc<dyn Clock>,
    next_conn_id: AtomicU64,
}

impl ArenaSession {
    /// Create a session around a freshly seeded world.
    pub fn new(seed: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            world: RwLock::new(World::new(seed)),
            clients: RwLock::new(BTreeMap::new()),
            inbox: InputMailbox::new(),
            clock,
            next_conn_id: AtomicU64::new(1),
        }
    }

    /// Fill the orb field to its target population (server startup).
    pub async fn seed_orbs(&self) {
        let mut world = self.world.write().await;
        populate_orbs(&mut world);
    }

    /// Register a new connection in the PENDING state.
    pub async fn register(&self, sender: mpsc::Sender<String>) -> ConnId {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        self.clients
            .write()
            .await
            .insert(conn_id, ClientConn { player: None, sender });
        debug!(conn_id, "connection registered");
        conn_id
    }

    /// Number of open connections.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Number of players in the world.
    pub async fn player_count(&self) -> usize {
        self.world.read().await.players.len()
    }

    /// Handle one inbound text frame from a connection.
    ///
    /// Malformed or unknown frames are logged and dropped; frames that do
    /// not apply in the connection's current state are silently ignored.
    /// Nothing here can fail the caller.
    pub async fn handle_frame(&self, conn_id: ConnId, text: &str) {
        let msg = match ClientMessage::from_json(text) {
            Ok(msg) => msg,
            Err(err) => {
                debug!(conn_id, %err, "dropping malformed frame");
                return;
            }
        };

        match msg {
            ClientMessage::Join { name, race } => self.handle_join(conn_id, name, race).await,
            ClientMessage::Input { input } => {
                if let Some(player_id) = self.player_of(conn_id).await {
                    self.inbox.store(player_id, input);
                }
            }
            ClientMessage::SelectClass { choice } => {
                self.handle_select_class(conn_id, &choice).await
            }
            ClientMessage::Ping { time } => {
                if self.player_of(conn_id).await.is_some() {
                    self.send_to_conn(conn_id, &ServerMessage::Pong { client_time: time })
                        .await;
                }
            }
        }
    }

    async fn handle_join(&self, conn_id: ConnId, name: String, race: String) {
        {
            let clients = self.clients.read().await;
            match clients.get(&conn_id) {
                // Double join: the connection already controls a player
                Some(conn) if conn.player.is_some() => return,
                Some(_) => {}
                None => return,
            }
        }

        let name: String = name.chars().take(MAX_NAME_LEN).collect();
        let race = Race::parse_or_default(&race);

        let (player_id, welcome) = {
            let mut world = self.world.write().await;
            let player_id = world.spawn_player(name.clone(), race);
            let welcome = ServerMessage::Welcome {
                player_id,
                map_width: world.map_width,
                map_height: world.map_height,
                initial_state: WorldView::from_world(&world),
            };
            (player_id, welcome)
        };

        let still_connected = {
            let mut clients = self.clients.write().await;
            match clients.get_mut(&conn_id) {
                Some(conn) => {
                    conn.player = Some(player_id);
                    true
                }
                None => false,
            }
        };
        // Connection dropped between the two locks; undo the spawn
        if !still_connected {
            self.world.write().await.remove_player(&player_id);
            return;
        }

        info!(conn_id, %player_id, %name, %race, "player joined");
        self.send_to_conn(conn_id, &welcome).await;
    }

    async fn handle_select_class(&self, conn_id: ConnId, choice: &str) {
        let Some(player_id) = self.player_of(conn_id).await else {
            return;
        };
        let Some(spec) = Specialization::parse(choice) else {
            debug!(conn_id, choice, "ignoring unknown specialization");
            return;
        };

        let reply = {
            let mut world = self.world.write().await;
            let Some(player) = world.get_player_mut(&player_id) else {
                return;
            };
            // A dead player waits out the respawn (which resets to level 1
            // anyway); choosing would set a nonzero hp on a corpse
            if !(player.level == 2 && player.can_choose_specialization && player.is_alive()) {
                // Not eligible; state frames that do not apply are ignored
                return;
            }

            player.apply_specialization(spec);
            ServerMessage::ClassSelected {
                player: PlayerView::from(&*player),
            }
        };

        info!(%player_id, %spec, "specialization chosen");
        self.send_to_conn(conn_id, &reply).await;
    }

    /// Tear down a connection.
    ///
    /// Removes the player record (if joined), cancels any pending respawn,
    /// and clears the input slot. Projectiles the player fired stay in
    /// flight until they expire naturally.
    pub async fn disconnect(&self, conn_id: ConnId) {
        let removed = self.clients.write().await.remove(&conn_id);
        let Some(conn) = removed else {
            return;
        };

        if let Some(player_id) = conn.player {
            self.inbox.remove(&player_id);
            self.world.write().await.remove_player(&player_id);
            info!(conn_id, %player_id, "player left");
        } else {
            debug!(conn_id, "pending connection closed");
        }
    }

    /// Run one tick: drain inputs, step the world, broadcast the snapshot,
    /// and route directed events.
    pub async fn run_tick(&self, dt: f64) {
        let now_ms = self.clock.now_ms();

        let inputs = self.inbox.drain();
        let outcome = {
            let mut world = self.world.write().await;
            tick(&mut world, &inputs, dt, now_ms)
        };

        let frame = {
            let world = self.world.read().await;
            game_state_frame(&world, now_ms)
        };

        match frame.to_json() {
            Ok(json) => self.broadcast(&json).await,
            Err(err) => warn!(%err, "failed to serialize snapshot"),
        }

        for event in outcome.events {
            match event {
                GameEvent::LevelUpReady { player_id } => {
                    self.send_to_player(player_id, &ServerMessage::LevelUpReady {})
                        .await;
                }
                GameEvent::PlayerKilled { victim, killer } => {
                    info!(%victim, killer = ?killer, "player killed");
                }
                GameEvent::PlayerRespawned { player_id } => {
                    debug!(%player_id, "player respawned");
                }
            }
        }
    }

    /// Deliver the same serialized frame to every open connection.
    ///
    /// A full or closed outbound queue drops the frame; the next tick's
    /// snapshot supersedes it.
    async fn broadcast(&self, json: &str) {
        let clients = self.clients.read().await;
        for (conn_id, conn) in clients.iter() {
            if conn.sender.try_send(json.to_string()).is_err() {
                debug!(conn_id, "outbound queue full; dropping snapshot");
            }
        }
    }

    async fn send_to_conn(&self, conn_id: ConnId, msg: &ServerMessage) {
        let json = match msg.to_json() {
            Ok(json) => json,
            Err(err) => {
                warn!(%err, "failed to serialize frame");
                return;
            }
        };

        let clients = self.clients.read().await;
        if let Some(conn) = clients.get(&conn_id) {
            if conn.sender.try_send(json).is_err() {
                debug!(conn_id, "outbound queue full; dropping frame");
            }
        }
    }

    async fn send_to_player(&self, player_id: PlayerId, msg: &ServerMessage) {
        let conn_id = {
            let clients = self.clients.read().await;
            clients
                .iter()
                .find(|(_, conn)| conn.player == Some(player_id))
                .map(|(conn_id, _)| *conn_id)
        };

        if let Some(conn_id) = conn_id {
            self.send_to_conn(conn_id, msg).await;
        }
    }

    async fn player_of(&self, conn_id: ConnId) -> Option<PlayerId> {
        self.clients.read().await.get(&conn_id).and_then(|c| c.player)
    }

    /// Read access to the world, for inspection and tests.
    pub fn world(&self) -> &RwLock<World> {
        &self.world
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::game::state::{MAP_WIDTH, RESPAWN_DELAY_MS};

    const DT: f64 = 1.0 / 60.0;

    struct TestClient {
        conn_id: ConnId,
        rx: mpsc::Receiver<String>,
    }

    impl TestClient {
        /// Pop the next outbound frame, parsed.
        fn next_frame(&mut self) -> Option<ServerMessage> {
            self.rx
                .try_recv()
                .ok()
                .map(|json| ServerMessage::from_json(&json).expect("valid frame"))
        }

        fn drain(&mut self) -> Vec<ServerMessage> {
            let mut frames = Vec::new();
            while let Some(frame) = self.next_frame() {
                frames.push(frame);
            }
            frames
        }
    }

    async fn connect(session: &ArenaSession) -> TestClient {
        let (tx, rx) = mpsc::channel(64);
        let conn_id = session.register(tx).await;
        TestClient { conn_id, rx }
    }

    async fn join(session: &ArenaSession, client: &mut TestClient, name: &str, race: &str) -> PlayerId {
        session
            .handle_frame(
                client.conn_id,
                &format!(r#"{{"type":"join","name":"{name}","race":"{race}"}}"#),
            )
            .await;

        match client.next_frame() {
            Some(ServerMessage::Welcome { player_id, .. }) => player_id,
            other => panic!("expected welcome, got {other:?}"),
        }
    }

    fn session() -> (Arc<ArenaSession>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let session = Arc::new(ArenaSession::new(7, clock.clone()));
        (session, clock)
    }

    #[tokio::test]
    async fn test_join_gets_welcome_with_world() {
        let (session, _clock) = session();
        let mut client = connect(&session).await;

        session
            .handle_frame(
                client.conn_id,
                r#"{"type":"join","name":"ada","race":"elf"}"#,
            )
            .await;

        match client.next_frame() {
            Some(ServerMessage::Welcome {
                map_width,
                initial_state,
                player_id,
                ..
            }) => {
                assert_eq!(map_width, MAP_WIDTH);
                assert_eq!(initial_state.players.len(), 1);
                assert_eq!(initial_state.players[0].id, player_id);
                assert_eq!(initial_state.players[0].name, "ada");
            }
            other => panic!("expected welcome, got {other:?}"),
        }

        assert_eq!(session.player_count().await, 1);
    }

    #[tokio::test]
    async fn test_join_sanitizes_name_and_race() {
        let (session, _clock) = session();
        let mut client = connect(&session).await;

        let player_id = join(
            &session,
            &mut client,
            "a_very_long_name_indeed",
            "dragon",
        )
        .await;

        let world = session.world().read().await;
        let player = world.get_player(&player_id).unwrap();
        assert_eq!(player.name.chars().count(), 16);
        assert_eq!(player.race, Race::Human);
    }

    #[tokio::test]
    async fn test_pending_connection_ignores_everything_but_join() {
        let (session, _clock) = session();
        let mut client = connect(&session).await;

        session
            .handle_frame(client.conn_id, r#"{"type":"ping","time":1.0}"#)
            .await;
        session
            .handle_frame(
                client.conn_id,
                r#"{"type":"input","input":{"up":true,"seq":1}}"#,
            )
            .await;
        session
            .handle_frame(client.conn_id, r#"{"type":"selectClass","choice":"mage"}"#)
            .await;

        assert!(client.next_frame().is_none());
        assert_eq!(session.player_count().await, 0);
    }

    #[tokio::test]
    async fn test_ping_pong_after_join() {
        let (session, _clock) = session();
        let mut client = connect(&session).await;
        join(&session, &mut client, "ada", "human").await;

        session
            .handle_frame(client.conn_id, r#"{"type":"ping","time":123.5}"#)
            .await;

        match client.next_frame() {
            Some(ServerMessage::Pong { client_time }) => assert_eq!(client_time, 123.5),
            other => panic!("expected pong, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_connection_alive() {
        let (session, _clock) = session();
        let mut client = connect(&session).await;
        join(&session, &mut client, "ada", "human").await;

        session.handle_frame(client.conn_id, "{{{{garbage").await;
        session
            .handle_frame(client.conn_id, r#"{"type":"teleport","x":0}"#)
            .await;

        // Still connected and responsive
        session
            .handle_frame(client.conn_id, r#"{"type":"ping","time":1.0}"#)
            .await;
        assert!(matches!(
            client.next_frame(),
            Some(ServerMessage::Pong { .. })
        ));
    }

    #[tokio::test]
    async fn test_input_flows_into_tick_and_echoes_seq() {
        let (session, _clock) = session();
        let mut client = connect(&session).await;
        let player_id = join(&session, &mut client, "ada", "human").await;

        session
            .handle_frame(
                client.conn_id,
                r#"{"type":"input","input":{"right":true,"seq":11}}"#,
            )
            .await;
        session.run_tick(DT).await;

        let frames = client.drain();
        let snapshot = frames
            .iter()
            .find_map(|f| match f {
                ServerMessage::GameState { players, .. } => Some(players.clone()),
                _ => None,
            })
            .expect("expected a gameState frame");

        let me = snapshot.iter().find(|p| p.id == player_id).unwrap();
        assert_eq!(me.last_processed_input_seq, 11);
        assert!(me.x > 0.0);
    }

    #[tokio::test]
    async fn test_snapshot_broadcast_to_all_connections() {
        let (session, _clock) = session();
        let mut a = connect(&session).await;
        let mut b = connect(&session).await;
        join(&session, &mut a, "ada", "human").await;
        join(&session, &mut b, "bob", "goblin").await;

        session.run_tick(DT).await;

        for client in [&mut a, &mut b] {
            let frames = client.drain();
            assert!(
                frames
                    .iter()
                    .any(|f| matches!(f, ServerMessage::GameState { players, .. } if players.len() == 2)),
                "missing snapshot"
            );
        }
    }

    #[tokio::test]
    async fn test_select_class_lifecycle() {
        let (session, _clock) = session();
        let mut client = connect(&session).await;
        let player_id = join(&session, &mut client, "ada", "human").await;

        // Not eligible yet: silently ignored
        session
            .handle_frame(client.conn_id, r#"{"type":"selectClass","choice":"mage"}"#)
            .await;
        assert!(client.next_frame().is_none());

        // Reach level 2 through an orb at the player's feet
        {
            let mut world = session.world().write().await;
            let pos = world.get_player(&player_id).unwrap().pos;
            world.get_player_mut(&player_id).unwrap().xp = 90;
            world.spawn_orb(pos, "#ffd447".into());
        }
        session.run_tick(DT).await;

        let frames = client.drain();
        assert!(
            frames.iter().any(|f| matches!(f, ServerMessage::LevelUpReady {})),
            "missing levelUpReady: {frames:?}"
        );

        // Unknown choice is ignored, valid choice applies
        session
            .handle_frame(
                client.conn_id,
                r#"{"type":"selectClass","choice":"necromancer"}"#,
            )
            .await;
        session
            .handle_frame(client.conn_id, r#"{"type":"selectClass","choice":"mage"}"#)
            .await;

        let frames = client.drain();
        match frames.last() {
            Some(ServerMessage::ClassSelected { player }) => {
                assert_eq!(player.class_or_mutation, Some(Specialization::Mage));
                assert_eq!(player.max_hp, 90);
                assert!(!player.can_choose_level2);
            }
            other => panic!("expected classSelected, got {other:?}"),
        }

        // Choosing twice is ignored
        session
            .handle_frame(client.conn_id, r#"{"type":"selectClass","choice":"king"}"#)
            .await;
        assert!(client.next_frame().is_none());
    }

    #[tokio::test]
    async fn test_select_class_ignored_while_dead() {
        let (session, _clock) = session();
        let mut client = connect(&session).await;
        let player_id = join(&session, &mut client, "ada", "human").await;

        {
            let mut world = session.world().write().await;
            let player = world.get_player_mut(&player_id).unwrap();
            player.xp = 100;
            player.level = 2;
            player.can_choose_specialization = true;
            crate::game::combat::apply_damage(&mut world, PlayerId::random(), player_id, 1000.0, 0);
        }

        session
            .handle_frame(client.conn_id, r#"{"type":"selectClass","choice":"mage"}"#)
            .await;

        client.drain();
        let world = session.world().read().await;
        let player = world.get_player(&player_id).unwrap();
        assert_eq!(player.specialization, None);
        assert_eq!(player.hp, 0);
        assert!(player.is_dead);
    }

    #[tokio::test]
    async fn test_disconnect_removes_player_and_cancels_respawn() {
        let (session, clock) = session();
        let mut client = connect(&session).await;
        let player_id = join(&session, &mut client, "ada", "human").await;

        // Kill the player so a respawn is queued
        {
            let mut world = session.world().write().await;
            let killer = PlayerId::random();
            crate::game::combat::apply_damage(&mut world, killer, player_id, 1000.0, 0);
            assert_eq!(world.respawn_queue.len(), 1);
        }

        session.disconnect(client.conn_id).await;
        assert_eq!(session.player_count().await, 0);
        assert_eq!(session.connection_count().await, 0);

        // The due respawn fires into a world without the player: no panic,
        // no resurrection
        clock.set(RESPAWN_DELAY_MS + 1000);
        session.run_tick(DT).await;
        assert_eq!(session.player_count().await, 0);
    }

    #[tokio::test]
    async fn test_projectiles_outlive_their_owner() {
        let (session, _clock) = session();
        let mut mage = connect(&session).await;
        let mut other = connect(&session).await;
        let mage_id = join(&session, &mut mage, "mage", "human").await;
        let bob_id = join(&session, &mut other, "bob", "human").await;

        {
            let mut world = session.world().write().await;
            // Park the bystander far from the projectile's path
            world.get_player_mut(&bob_id).unwrap().pos = crate::core::vec2::Vec2::new(100.0, 1900.0);
            let player = world.get_player_mut(&mage_id).unwrap();
            player.level = 2;
            player.apply_specialization(Specialization::Mage);
            player.pos = crate::core::vec2::Vec2::new(500.0, 500.0);
            player.last_input.attack = true;
            player.last_input.mouse_x = Some(1500.0);
            player.last_input.mouse_y = Some(500.0);
        }
        session.run_tick(DT).await;
        {
            let world = session.world().read().await;
            assert_eq!(world.projectiles.len(), 1);
        }

        session.disconnect(mage.conn_id).await;
        session.run_tick(DT).await;

        let world = session.world().read().await;
        assert_eq!(world.projectiles.len(), 1, "orphan projectile should fly on");
        assert!(world.get_player(&mage_id).is_none());
    }

    #[tokio::test]
    async fn test_dead_player_appears_in_snapshot() {
        let (session, _clock) = session();
        let mut client = connect(&session).await;
        let player_id = join(&session, &mut client, "ada", "human").await;

        {
            let mut world = session.world().write().await;
            crate::game::combat::apply_damage(&mut world, PlayerId::random(), player_id, 1000.0, 0);
        }
        client.drain();
        session.run_tick(DT).await;

        let frames = client.drain();
        let players = frames
            .iter()
            .find_map(|f| match f {
                ServerMessage::GameState { players, .. } => Some(players.clone()),
                _ => None,
            })
            .expect("expected a gameState frame");

        assert_eq!(players.len(), 1);
        assert!(players[0].is_dead);
        assert_eq!(players[0].hp, 0);
    }

    #[tokio::test]
    async fn test_full_outbound_queue_drops_frames() {
        let (session, _clock) = session();
        let (tx, mut rx) = mpsc::channel(1);
        let conn_id = session.register(tx).await;
        session
            .handle_frame(conn_id, r#"{"type":"join","name":"ada","race":"human"}"#)
            .await;

        // Queue is full (welcome occupies the single slot); snapshots drop
        session.run_tick(DT).await;
        session.run_tick(DT).await;

        // The welcome is still intact and the session kept running
        let first = rx.try_recv().unwrap();
        assert!(first.contains(r#""type":"welcome""#));
        assert_eq!(session.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_seed_orbs_fills_field() {
        let (session, _clock) = session();
        session.seed_orbs().await;
        let world = session.world().read().await;
        assert_eq!(world.orbs.len(), crate::game::state::ORB_TARGET_POPULATION);
    }
}
