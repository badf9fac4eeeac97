//! Monitoring rules: which zone is protected and how long violators are kept.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::geofence::NoFlyZone;
use crate::registry::DEFAULT_RETENTION_SECS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorRules {
    /// Zone drones must stay out of
    pub zone: NoFlyZone,
    /// How long a pilot stays listed after the last sighting, in seconds
    pub retention_secs: i64,
}

impl Default for MonitorRules {
    fn default() -> Self {
        Self {
            zone: NoFlyZone::default(),
            retention_secs: DEFAULT_RETENTION_SECS,
        }
    }
}

impl MonitorRules {
    /// Set the retention window, clamped to what a `Duration` can hold.
    pub fn with_retention_secs(mut self, retention_secs: i64) -> Self {
        self.retention_secs = retention_secs.clamp(0, Duration::MAX.num_seconds());
        self
    }

    pub fn retention(&self) -> Duration {
        Duration::try_seconds(self.retention_secs.max(0)).unwrap_or(Duration::MAX)
    }
}
