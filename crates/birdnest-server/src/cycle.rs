//! One poll cycle: fetch, detect, resolve pilots, merge, expire, persist.
//!
//! Cycles are serialized by an internal lock held from the snapshot fetch
//! until the registry has been persisted, so two triggers never interleave
//! their load/merge/save.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use thiserror::Error;
use tokio::sync::Mutex;

use birdnest_core::{
    MergeSummary, MonitorRules, PilotRecord, ViolationEvent, ViolatorRegistry,
};
use birdnest_feed::{DroneFeed, FetchError, PilotDirectory};

use crate::backoff::Backoff;
use crate::persistence::{RegistryStore, StoreError};

const PERSIST_BACKOFF_BASE_MS: u64 = 50;
const PERSIST_BACKOFF_MAX_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum CycleError {
    /// Snapshot could not be fetched or parsed; nothing was touched.
    #[error("snapshot fetch failed: {0}")]
    Snapshot(#[source] FetchError),

    /// Every save attempt failed; the stored registry is the previous one.
    #[error("registry save failed after {attempts} attempts: {source}")]
    Persist {
        attempts: u32,
        #[source]
        source: StoreError,
    },
}

/// What a completed cycle did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub now: DateTime<Utc>,
    pub drones_seen: usize,
    pub violations: usize,
    /// Serials whose pilot lookup failed this cycle
    pub unresolved: Vec<String>,
    pub merge: MergeSummary,
    pub expired: usize,
    /// Registry as persisted at the end of the cycle
    pub registry: ViolatorRegistry,
}

pub struct PollCycle {
    feed: Arc<dyn DroneFeed>,
    pilots: Arc<dyn PilotDirectory>,
    store: Arc<dyn RegistryStore>,
    rules: MonitorRules,
    persist_attempts: u32,
    guard: Mutex<()>,
}

impl PollCycle {
    pub fn new(
        feed: Arc<dyn DroneFeed>,
        pilots: Arc<dyn PilotDirectory>,
        store: Arc<dyn RegistryStore>,
        rules: MonitorRules,
    ) -> Self {
        Self {
            feed,
            pilots,
            store,
            rules,
            persist_attempts: 3,
            guard: Mutex::new(()),
        }
    }

    pub fn with_persist_attempts(mut self, attempts: u32) -> Self {
        self.persist_attempts = attempts.max(1);
        self
    }

    pub fn rules(&self) -> &MonitorRules {
        &self.rules
    }

    /// Run a cycle, waiting for any cycle already in progress.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport, CycleError> {
        let _guard = self.guard.lock().await;
        self.run_locked(now).await
    }

    /// Run a cycle unless one is already in progress, in which case `None`.
    pub async fn try_run_cycle(
        &self,
        now: DateTime<Utc>,
    ) -> Option<Result<CycleReport, CycleError>> {
        let _guard = self.guard.try_lock().ok()?;
        Some(self.run_locked(now).await)
    }

    /// Load the stored registry, treating an unreadable store as empty.
    pub async fn load_registry(&self) -> ViolatorRegistry {
        match self.store.load().await {
            Ok(registry) => registry,
            Err(err) => {
                tracing::warn!(
                    "Registry store {} unreadable, starting empty: {}",
                    self.store.describe(),
                    err
                );
                ViolatorRegistry::new()
            }
        }
    }

    async fn run_locked(&self, now: DateTime<Utc>) -> Result<CycleReport, CycleError> {
        let snapshot = self
            .feed
            .fetch_snapshot()
            .await
            .map_err(CycleError::Snapshot)?;

        let events = self.rules.zone.detect(&snapshot.drones, now);
        let violations = events.len();
        let (sightings, unresolved) = self.resolve_pilots(events).await;

        let mut registry = self.load_registry().await;
        let merge = registry.merge(sightings);
        let expired = registry.expire(now, self.rules.retention()).len();

        self.persist(&registry).await?;

        tracing::debug!(
            "Cycle done: {} drones, {} violating, {} new, {} updated, {} expired, {} listed",
            snapshot.drones.len(),
            violations,
            merge.inserted,
            merge.updated,
            expired,
            registry.len()
        );

        Ok(CycleReport {
            now,
            drones_seen: snapshot.drones.len(),
            violations,
            unresolved,
            merge,
            expired,
            registry,
        })
    }

    /// Look up every violating drone's pilot concurrently. Failed lookups
    /// are logged and left out.
    async fn resolve_pilots(
        &self,
        events: Vec<ViolationEvent>,
    ) -> (Vec<(ViolationEvent, PilotRecord)>, Vec<String>) {
        let lookups = events.into_iter().map(|event| async move {
            let result = self.pilots.resolve(&event.drone_serial).await;
            (event, result)
        });

        let mut sightings = Vec::new();
        let mut unresolved = Vec::new();
        for (event, result) in join_all(lookups).await {
            match result {
                Ok(pilot) => sightings.push((event, pilot)),
                Err(err) => {
                    tracing::warn!("Pilot lookup for drone {} failed: {}", event.drone_serial, err);
                    unresolved.push(event.drone_serial);
                }
            }
        }
        (sightings, unresolved)
    }

    async fn persist(&self, registry: &ViolatorRegistry) -> Result<(), CycleError> {
        let mut backoff = Backoff::new(
            Duration::from_millis(PERSIST_BACKOFF_BASE_MS),
            Duration::from_millis(PERSIST_BACKOFF_MAX_MS),
        );

        loop {
            match self.store.save(registry).await {
                Ok(()) => return Ok(()),
                Err(err) if backoff.failures() + 1 >= self.persist_attempts => {
                    tracing::error!(
                        "Registry save to {} failed, {} violators not persisted: {}",
                        self.store.describe(),
                        registry.len(),
                        err
                    );
                    return Err(CycleError::Persist {
                        attempts: self.persist_attempts,
                        source: err,
                    });
                }
                Err(err) => {
                    let delay = backoff.fail();
                    tracing::warn!(
                        "Registry save attempt {} failed, retrying in {:?}: {}",
                        backoff.failures(),
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
