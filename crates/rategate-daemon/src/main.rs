//! rategate-daemon: serves the rate validator over a local socket.
//!
//! Single OS process running a Tokio async runtime. Clients talk to the
//! daemon with newline-delimited JSON-RPC 2.0 over a Unix socket.

mod clock;
mod commands;
mod config;
mod engine;
mod events;
mod rpc;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::DaemonConfig;
use crate::engine::Engine;
use crate::events::EventBus;
use crate::rpc::RpcServer;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Validator, feeds and store. Every call is serialized through this lock.
    pub engine: tokio::sync::Mutex<Engine>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // Initialize tracing; RUST_LOG overrides the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("rategate={}", config.advanced.log_level)))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(version = env!("CARGO_PKG_VERSION"), "rategate daemon starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database and load or initialize the snapshot
    let db_path = data_dir.join("rategate.db");
    let conn = rategate_db::open(&db_path)?;
    let engine = Engine::open(conn, &config, clock::now_secs())?;
    if config.advanced.dev_mode {
        info!("development commands enabled");
    }

    // 3. Build daemon state
    let event_bus = EventBus::new(config.service.event_buffer);
    let socket_path = config.socket_path();
    let state = Arc::new(DaemonState {
        engine: tokio::sync::Mutex::new(engine),
        config,
        event_bus,
    });

    // 4. Run the RPC server until interrupted
    let rpc_server = RpcServer::new(state, socket_path.clone());
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Clean up socket file
    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}
