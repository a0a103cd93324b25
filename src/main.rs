//! Orb Arena Game Server
//!
//! Binary entry point: initialize logging, read the listen port, run the
//! server until it is signalled to stop.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use orb_arena::game::state::{MAP_HEIGHT, MAP_WIDTH};
use orb_arena::network::server::{GameServer, ServerConfig};
use orb_arena::{TICK_RATE, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port: u16 = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse()
            .with_context(|| format!("invalid port argument: {arg}"))?,
        None => 8080,
    };

    let config = ServerConfig {
        bind_addr: ([0, 0, 0, 0], port).into(),
        ..Default::default()
    };

    info!("Orb Arena Server v{VERSION}");
    info!("tick rate: {TICK_RATE} Hz");
    info!("map: {MAP_WIDTH}x{MAP_HEIGHT}");

    let server = GameServer::new(config);
    server.run().await.context("server terminated")?;

    Ok(())
}
