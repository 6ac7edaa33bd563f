//! Qor3a Draw Server
//!
//! Serves the deterministic draw API over WebSocket.
//! Every persisted draw can be independently re-derived and verified
//! from its published inputs.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use qor3a::network::{DrawServer, ServerConfig};
use qor3a::store::DrawStore;
use qor3a::VERSION;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::from_env();
    info!("Qor3a Draw Server v{}", VERSION);
    info!("Bind address: {}", config.bind_addr);

    let store = match &config.snapshot_path {
        Some(path) if path.exists() => DrawStore::load_snapshot(path)
            .with_context(|| format!("loading store snapshot from {}", path.display()))?,
        Some(path) => {
            info!("No snapshot at {}, starting empty", path.display());
            DrawStore::new()
        }
        None => {
            warn!("QOR3A_SNAPSHOT_PATH not set: draws will not survive restart");
            DrawStore::new()
        }
    };

    let snapshot_path = config.snapshot_path.clone();
    let server = DrawServer::new(config, store);
    let store_handle = server.store();

    tokio::select! {
        result = server.run() => {
            result.context("server terminated")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            server.shutdown();
        }
    }

    if let Some(path) = snapshot_path {
        store_handle
            .read()
            .await
            .save_snapshot(&path)
            .with_context(|| format!("saving store snapshot to {}", path.display()))?;
    }

    Ok(())
}
