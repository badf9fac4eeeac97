//! Server configuration from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use birdnest_core::DEFAULT_RETENTION_SECS;
use birdnest_feed::client::{DEFAULT_DRONES_URL, DEFAULT_PILOTS_URL};

/// Backing store for the violator registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Pretty-printed JSON document replaced atomically on every save
    Json,
    /// SQLite table rewritten in one transaction
    Sqlite,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "file" => Ok(Self::Json),
            "sqlite" | "db" => Ok(Self::Sqlite),
            other => Err(format!("unknown store kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub drones_url: String,
    pub pilots_url: String,
    pub poll_interval_ms: u64,
    pub http_timeout_secs: u64,
    pub retention_secs: i64,
    pub store_kind: StoreKind,
    pub registry_path: String,
    pub database_path: String,
    pub database_max_connections: u32,
    pub persist_attempts: u32,
    pub refresh_on_view: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8080,
            drones_url: DEFAULT_DRONES_URL.to_string(),
            pilots_url: DEFAULT_PILOTS_URL.to_string(),
            poll_interval_ms: 2000,
            http_timeout_secs: 5,
            retention_secs: DEFAULT_RETENTION_SECS,
            store_kind: StoreKind::Json,
            registry_path: "data/pilot_information.json".to_string(),
            database_path: "data/birdnest.db".to_string(),
            database_max_connections: 4,
            persist_attempts: 3,
            refresh_on_view: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("BIRDNEST_PORT").unwrap_or(defaults.server_port),
            drones_url: env::var("BIRDNEST_DRONES_URL").unwrap_or(defaults.drones_url),
            pilots_url: env::var("BIRDNEST_PILOTS_URL").unwrap_or(defaults.pilots_url),
            poll_interval_ms: parse_var("BIRDNEST_POLL_INTERVAL_MS")
                .filter(|ms| *ms > 0)
                .unwrap_or(defaults.poll_interval_ms),
            http_timeout_secs: parse_var("BIRDNEST_HTTP_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.http_timeout_secs),
            retention_secs: parse_var("BIRDNEST_RETENTION_SECS")
                .filter(|secs| *secs >= 0)
                .unwrap_or(defaults.retention_secs),
            store_kind: parse_var("BIRDNEST_STORE").unwrap_or(defaults.store_kind),
            registry_path: env::var("BIRDNEST_REGISTRY_PATH").unwrap_or(defaults.registry_path),
            database_path: env::var("BIRDNEST_DATABASE_PATH").unwrap_or(defaults.database_path),
            database_max_connections: parse_var("BIRDNEST_DATABASE_MAX_CONNECTIONS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.database_max_connections),
            persist_attempts: parse_var("BIRDNEST_PERSIST_ATTEMPTS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.persist_attempts),
            refresh_on_view: parse_var("BIRDNEST_REFRESH_ON_VIEW").unwrap_or(defaults.refresh_on_view),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn parse_var<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|raw| raw.trim().parse().ok())
}
