//! SQLite-backed registry store.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use birdnest_core::{ViolatorRecord, ViolatorRegistry};

use super::{RegistryStore, StoreError};

/// Registry kept in the `violators` table, one JSON record per pilot.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    path: String,
}

impl SqliteStore {
    /// Open (creating if needed) the database and run migrations.
    pub async fn open(db_path: &str, max_connections: u32) -> Result<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!("Connecting to database: {}", db_path);
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        run_migrations(&pool).await?;

        Ok(Self {
            pool,
            path: db_path.to_string(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let migration_sql = include_str!("../../migrations/001_init.sql");

    for statement in migration_sql.split(';') {
        let statement: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[async_trait]
impl RegistryStore for SqliteStore {
    async fn load(&self) -> Result<ViolatorRegistry, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT record FROM violators")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|(record,)| serde_json::from_str::<ViolatorRecord>(&record).map_err(StoreError::from))
            .collect()
    }

    async fn save(&self, registry: &ViolatorRegistry) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM violators").execute(&mut *tx).await?;

        for record in registry.iter() {
            let payload = serde_json::to_string(record)?;
            sqlx::query(
                "INSERT INTO violators (pilot_id, record, time_of_violation) VALUES (?1, ?2, ?3)",
            )
            .bind(record.pilot_id())
            .bind(&payload)
            .bind(record.time_of_violation.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path)
    }
}
