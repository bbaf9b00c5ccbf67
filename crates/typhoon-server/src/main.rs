mod config;
mod network;

use config::ServerConfig;
use network::Shared;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use typhoon_protocol_core::PacketRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Typhoon limbo...");

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config/server.toml"));
    let config = ServerConfig::load(&config_path)?;
    let server = config.to_snapshot();
    let compression = match server.compression_threshold {
        Some(threshold) => threshold.to_string(),
        None => "off".to_string(),
    };
    info!(
        "Config loaded: bind={}:{}, max_players={}, restricted={}, compression={}",
        config.bind,
        config.port,
        config.max_players,
        config.restricted,
        compression
    );

    let shared = Shared {
        server: Arc::new(server),
        registry: Arc::new(PacketRegistry::serverbound()),
        keepalive_interval: config.keepalive_interval(),
    };

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    tokio::select! {
        _ = accept_loop(listener, shared) => {
            error!("Accept loop exited unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    Ok(())
}

async fn accept_loop(listener: TcpListener, shared: Shared) {
    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                if let Err(e) = socket.set_nodelay(true) {
                    error!("Failed to set TCP_NODELAY for {}: {}", peer, e);
                }
                let shared = shared.clone();
                tokio::spawn(network::handle_connection(socket, peer, shared));
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
