//! Brightcast Game Server
//!
//! Authoritative WebSocket server for the Brightcast card duel.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use brightcast::VERSION;
use brightcast::network::{GameServer, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let bind_addr: SocketAddr = std::env::var("BRIGHTCAST_BIND")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()
        .context("Invalid BRIGHTCAST_BIND address")?;

    let config = ServerConfig {
        bind_addr,
        ..Default::default()
    };

    info!("Brightcast Server v{}", VERSION);
    info!("Listening on {}", config.bind_addr);

    let server = GameServer::new(config);
    server.run().await.context("Server error")?;

    Ok(())
}
