//! Swarm Harness - synthetic load and accuracy measurement for a
//! multiplayer game server
//!
//! Spawns a fleet of simulated players against a running server:
//! - each client walks the navmesh with retry-bounded random movement
//! - inbound snapshot cadence is logged per client
//! - dead-reckoning prediction error against peers is logged per client

mod config;
mod session;
mod sim;
mod util;
mod ws;

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::session::{ClientSession, SessionConfig};
use crate::sim::NavGrid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting swarm harness");
    info!("Server endpoint: {}", config.server_url);

    // The grid is built once and shared read-only by every session.
    let grid = Arc::new(NavGrid::from_file(&config.navmesh_path)?);
    info!(
        rows = grid.rows(),
        cols = grid.cols(),
        "Navmesh loaded from {}",
        config.navmesh_path.display()
    );

    let mut sessions = JoinSet::new();
    for n in 0..config.client_count {
        let session = ClientSession::new(
            SessionConfig {
                server_url: config.server_url.clone(),
                display_name: format!("client-{n}"),
                tick_interval: config.tick_interval,
                move_speed: config.move_speed,
                rng_seed: config.rng_seed.wrapping_add(n as u64),
                output_dir: config.output_dir.clone(),
            },
            grid.clone(),
        )?;
        sessions.spawn(async move {
            // A failure here is terminal for this client only.
            if let Err(e) = session.run().await {
                error!(client = n, error = %e, "session terminated");
            }
        });
    }

    info!(clients = config.client_count, "All sessions spawned");

    tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown requested, stopping sessions");
        }
        _ = drain(&mut sessions) => {
            info!("All sessions finished");
        }
    }

    sessions.shutdown().await;
    info!("Harness shutdown complete");
    Ok(())
}

async fn drain(sessions: &mut JoinSet<()>) {
    while sessions.join_next().await.is_some() {}
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
