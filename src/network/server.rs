//! WebSocket Game Server
//!
//! Accepts connections, pumps frames between sockets and the arena session,
//! and drives the tick loop. All game logic lives behind
//! [`ArenaSession`]; this file is plumbing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::core::clock::{Clock, SystemClock};
use crate::network::session::ArenaSession;
use crate::TICK_INTERVAL_US;

/// Per-connection outbound queue depth, roughly one second of snapshots.
const OUTBOUND_QUEUE_DEPTH: usize = 64;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Tick rate for the game simulation (Hz).
    pub tick_rate: u32,
    /// World RNG seed; `None` derives one from the system time.
    pub world_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().expect("static addr"),
            max_connections: 256,
            tick_rate: 60,
            world_seed: None,
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to the listen address.
    #[error("failed to bind: {0}")]
    Bind(#[from] std::io::Error),

    /// WebSocket error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// The game server: one arena, many connections.
pub struct GameServer {
    config: ServerConfig,
    session: Arc<ArenaSession>,
    clock: Arc<dyn Clock>,
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let seed = config.world_seed.unwrap_or_else(seed_from_time);

        Self {
            session: Arc::new(ArenaSession::new(seed, clock.clone())),
            config,
            clock,
            shutdown_tx,
        }
    }

    /// Run the server until shutdown.
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("game server listening on {}", self.config.bind_addr);

        self.session.seed_orbs().await;

        // Spawn the tick worker
        let tick_session = self.session.clone();
        let tick_clock = self.clock.clone();
        let tick_rate = self.config.tick_rate;
        let tick_shutdown = self.shutdown_tx.subscribe();
        let tick_handle = tokio::spawn(async move {
            run_tick_loop(tick_session, tick_clock, tick_rate, tick_shutdown).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.session.connection_count().await >= self.config.max_connections {
                                warn!(%addr, "connection limit reached, refusing");
                                continue;
                            }
                            debug!(%addr, "new connection");
                            self.handle_connection(stream, addr);
                        }
                        Err(err) => {
                            error!(%err, "accept error");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        tick_handle.abort();
        Ok(())
    }

    /// Handle a new WebSocket connection on its own task.
    ///
    /// A failure anywhere in here tears down this connection only; the tick
    /// worker and every other connection are untouched.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let session = self.session.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(err) => {
                    debug!(%addr, %err, "websocket handshake failed");
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE_DEPTH);

            let conn_id = session.register(msg_tx).await;

            // Writer task: drains the outbound queue onto the socket
            let writer_task = tokio::spawn(async move {
                while let Some(text) = msg_rx.recv().await {
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                session.handle_frame(conn_id, &text).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!(%addr, "client disconnected");
                                break;
                            }
                            Some(Err(err)) => {
                                debug!(%addr, %err, "websocket error");
                                break;
                            }
                            // Binary and control frames carry nothing for us
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            writer_task.abort();
            session.disconnect(conn_id).await;
            debug!(%addr, "connection cleaned up");
        });
    }

    /// Signal every task to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Open connection count.
    pub async fn connection_count(&self) -> usize {
        self.session.connection_count().await
    }

    /// Players currently in the world.
    pub async fn player_count(&self) -> usize {
        self.session.player_count().await
    }
}

/// Drive the session at the configured tick rate.
///
/// Wall delta time is measured from the clock each firing; the tick itself
/// caps it, so a stall integrates as one bounded step instead of a tunnel.
async fn run_tick_loop(
    session: Arc<ArenaSession>,
    clock: Arc<dyn Clock>,
    tick_rate: u32,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let tick_duration = if tick_rate > 0 {
        Duration::from_micros(1_000_000 / tick_rate as u64)
    } else {
        Duration::from_micros(TICK_INTERVAL_US)
    };

    let mut ticker = interval(tick_duration);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_ms = clock.now_ms();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now_ms = clock.now_ms();
                let dt = now_ms.saturating_sub(last_ms) as f64 / 1000.0;
                last_ms = now_ms;
                session.run_tick(dt).await;
            }
            _ = shutdown_rx.recv() => {
                break;
            }
        }
    }
}

/// Entropy-grade seed for the production world RNG.
fn seed_from_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5eed)
}

// =============================================================================
// TESTS
// =============================================================================
