//! Durable storage for the violator registry.
//!
//! A store is read at the start of each poll cycle and replaced as a whole
//! at the end of it. Implementations must make the replace atomic: a reader
//! sees either the previous registry or the new one.

pub mod json_file;
pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use birdnest_core::ViolatorRegistry;

use crate::config::{Config, StoreKind};

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("registry file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry contents are corrupt: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("registry database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("registry store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Read the whole registry. An absent store is an empty registry.
    async fn load(&self) -> Result<ViolatorRegistry, StoreError>;

    /// Replace the stored registry.
    async fn save(&self, registry: &ViolatorRegistry) -> Result<(), StoreError>;

    fn describe(&self) -> String;
}

/// Open the store selected by the configuration.
pub async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn RegistryStore>> {
    let store: Arc<dyn RegistryStore> = match config.store_kind {
        StoreKind::Json => Arc::new(JsonFileStore::new(&config.registry_path)),
        StoreKind::Sqlite => Arc::new(
            SqliteStore::open(&config.database_path, config.database_max_connections).await?,
        ),
    };
    tracing::info!("Using registry store {}", store.describe());
    Ok(store)
}
