//! Collaborator interfaces consumed by the poll cycle.

use async_trait::async_trait;

use birdnest_core::{DroneSnapshot, PilotRecord};

use crate::error::FetchError;

/// Source of drone position snapshots.
#[async_trait]
pub trait DroneFeed: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<DroneSnapshot, FetchError>;
}

/// Lookup of the pilot flying a given drone.
#[async_trait]
pub trait PilotDirectory: Send + Sync {
    async fn resolve(&self, drone_serial: &str) -> Result<PilotRecord, FetchError>;
}
