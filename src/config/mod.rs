//! Configuration module - environment variable parsing

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Harness configuration loaded from environment variables. Every variable
/// has a default, so the harness runs unconfigured against a local server.
#[derive(Clone, Debug)]
pub struct Config {
    /// WebSocket endpoint of the game server
    pub server_url: String,
    /// Number of simulated clients to run
    pub client_count: usize,
    /// Path to the walkability grid (JSON matrix)
    pub navmesh_path: PathBuf,
    /// Outbound tick period
    pub tick_interval: Duration,
    /// Movement speed in world units per second
    pub move_speed: f64,
    /// Base seed for the per-client movement RNGs; random when unset
    pub rng_seed: u64,
    /// Directory for per-client measurement logs; logging disabled when unset
    pub output_dir: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server_url: env::var("SERVER_URL")
                .unwrap_or_else(|_| "ws://localhost:10000/connect".to_string()),
            client_count: parse_var("CLIENTS", 9)?,
            navmesh_path: env::var("NAVMESH_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("navmesh.json")),
            tick_interval: Duration::from_millis(parse_var("TICK_MS", 50)?),
            move_speed: parse_var("MOVE_SPEED", 120.0)?,
            rng_seed: match env::var("RNG_SEED") {
                Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid("RNG_SEED"))?,
                Err(_) => rand::random(),
            },
            output_dir: env::var("OUTPUT_DIR").ok().map(PathBuf::from),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
