//! Periodic poll loop.
//!
//! Triggers a poll cycle on a fixed interval. While the upstream keeps
//! failing, ticks are skipped according to a capped backoff so an outage
//! doesn't turn into a tight retry loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};

use crate::backoff::Backoff;
use crate::cycle::CycleError;
use crate::state::AppState;

const POLL_BACKOFF_MAX_SECS: u64 = 30;

/// Start the poll loop. Runs until `shutdown` fires.
pub async fn run_poll_loop(
    state: Arc<AppState>,
    poll_interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut backoff = Backoff::new(poll_interval, Duration::from_secs(POLL_BACKOFF_MAX_SECS));

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Poll loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                if !backoff.ready() {
                    continue;
                }

                match state.poll(Utc::now()).await {
                    Ok(report) => {
                        if backoff.failures() > 0 {
                            tracing::info!(
                                "Upstream recovered after {} failed cycles",
                                backoff.failures()
                            );
                        }
                        backoff.reset();
                        if !report.unresolved.is_empty() {
                            tracing::debug!(
                                "{} violating drones without a pilot this cycle",
                                report.unresolved.len()
                            );
                        }
                    }
                    Err(CycleError::Snapshot(err)) => {
                        let delay = backoff.fail();
                        tracing::warn!("Snapshot fetch failed, next attempt in {:?}: {}", delay, err);
                    }
                    Err(err) => {
                        let delay = backoff.fail();
                        tracing::error!("Poll cycle failed, next attempt in {:?}: {}", delay, err);
                    }
                }
            }
        }
    }
}
