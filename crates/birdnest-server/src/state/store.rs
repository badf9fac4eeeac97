//! Published violator view and poll-cycle bookkeeping.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use birdnest_core::{ViolatorRecord, ViolatorRegistry};

use crate::cycle::{CycleError, CycleReport, PollCycle};

/// Outcome of the most recent poll cycles, served on `/health`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleStatus {
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub consecutive_failures: u32,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub listed_violators: usize,
}

/// Registry handed to readers, stamped with the cycle time that produced it.
#[derive(Debug, Default)]
struct PublishedView {
    produced_at: Option<DateTime<Utc>>,
    registry: ViolatorRegistry,
}

/// Application state - the poll cycle plus the last registry it produced.
pub struct AppState {
    cycle: PollCycle,
    view: RwLock<PublishedView>,
    status: Mutex<CycleStatus>,
    refresh_on_view: bool,
}

impl AppState {
    pub fn new(cycle: PollCycle) -> Self {
        Self {
            cycle,
            view: RwLock::new(PublishedView::default()),
            status: Mutex::new(CycleStatus::default()),
            refresh_on_view: true,
        }
    }

    pub fn with_refresh_on_view(mut self, enabled: bool) -> Self {
        self.refresh_on_view = enabled;
        self
    }

    pub fn refresh_on_view(&self) -> bool {
        self.refresh_on_view
    }

    /// Seed the view from the persisted registry.
    pub async fn load_view(&self) {
        let registry = self.cycle.load_registry().await;
        tracing::info!("Loaded {} violators from store", registry.len());
        self.publish(None, registry).await;
    }

    /// Run a cycle, waiting for one already in progress.
    pub async fn poll(&self, now: DateTime<Utc>) -> Result<CycleReport, CycleError> {
        let result = self.cycle.run_cycle(now).await;
        self.record(&result).await;
        result
    }

    /// Run a cycle only if none is in progress.
    pub async fn poll_if_idle(&self, now: DateTime<Utc>) -> Option<Result<CycleReport, CycleError>> {
        let result = self.cycle.try_run_cycle(now).await?;
        self.record(&result).await;
        Some(result)
    }

    /// Violators to show at `now`, newest first.
    ///
    /// Records past the retention window are hidden even when no cycle has
    /// succeeded since they aged out.
    pub async fn violators(&self, now: DateTime<Utc>) -> Vec<ViolatorRecord> {
        let retention = self.cycle.rules().retention();
        let visible = self.view.read().await.registry.retained_at(now, retention);
        visible.by_recency().into_iter().cloned().collect()
    }

    pub fn status(&self) -> CycleStatus {
        match self.status.lock() {
            Ok(status) => status.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the view unless a later cycle already published.
    async fn publish(&self, produced_at: Option<DateTime<Utc>>, registry: ViolatorRegistry) {
        let mut view = self.view.write().await;
        if let (Some(current), Some(incoming)) = (view.produced_at, produced_at) {
            if incoming < current {
                return;
            }
        }
        let listed = registry.len();
        view.produced_at = produced_at.or(view.produced_at);
        view.registry = registry;
        drop(view);
        self.update_status(|status| status.listed_violators = listed);
    }

    async fn record(&self, result: &Result<CycleReport, CycleError>) {
        match result {
            Ok(report) => {
                self.publish(Some(report.now), report.registry.clone()).await;
                self.update_status(|status| {
                    status.cycles_completed += 1;
                    status.consecutive_failures = 0;
                    status.last_success_at = Some(report.now);
                    status.last_error = None;
                });
            }
            Err(err) => {
                let message = err.to_string();
                self.update_status(|status| {
                    status.cycles_failed += 1;
                    status.consecutive_failures = status.consecutive_failures.saturating_add(1);
                    status.last_error = Some(message);
                });
            }
        }
    }

    fn update_status(&self, apply: impl FnOnce(&mut CycleStatus)) {
        let mut status = match self.status.lock() {
            Ok(status) => status,
            Err(poisoned) => poisoned.into_inner(),
        };
        apply(&mut status);
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::Arc;

    use async_trait::async_trait;

    use birdnest_core::{DroneSnapshot, MonitorRules, PilotRecord};
    use birdnest_feed::{DroneFeed, FetchError, PilotDirectory};

    use super::*;
    use crate::persistence::MemoryStore;

    struct EmptySky;

    #[async_trait]
    impl DroneFeed for EmptySky {
        async fn fetch_snapshot(&self) -> Result<DroneSnapshot, FetchError> {
            Ok(DroneSnapshot::default())
        }
    }

    #[async_trait]
    impl PilotDirectory for EmptySky {
        async fn resolve(&self, drone_serial: &str) -> Result<PilotRecord, FetchError> {
            Err(FetchError::NotFound {
                serial: drone_serial.to_string(),
            })
        }
    }

    fn app_state() -> AppState {
        AppState::new(PollCycle::new(
            Arc::new(EmptySky),
            Arc::new(EmptySky),
            Arc::new(MemoryStore::new()),
            MonitorRules::default(),
        ))
    }

    #[tokio::test]
    async fn status_keeps_counting_after_lock_poisoning() {
        let state = app_state();
        let poisoned = catch_unwind(AssertUnwindSafe(|| {
            let _status = state.status.lock().unwrap();
            panic!("handler panicked while holding status");
        }));
        assert!(poisoned.is_err());
        assert!(state.status.is_poisoned());

        let failure = Err(CycleError::Snapshot(FetchError::parse("drone snapshot", "eof")));
        state.record(&failure).await;
        state.poll(Utc::now()).await.unwrap();

        let status = state.status();
        assert_eq!(status.cycles_failed, 1);
        assert_eq!(status.cycles_completed, 1);
        assert_eq!(status.consecutive_failures, 0);
    }
}
