//! No-fly zone geometry and violation detection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{DroneSnapshotEntry, Position, ViolationEvent};

/// Center of the protected nest.
pub const NFZ_CENTER: Position = Position {
    x: 250_000.0,
    y: 250_000.0,
};

/// Radius of the no-fly zone around the nest.
pub const NFZ_RADIUS: f64 = 100_000.0;

/// Circular no-fly zone. The boundary belongs to the zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoFlyZone {
    pub center: Position,
    pub radius: f64,
}

impl Default for NoFlyZone {
    fn default() -> Self {
        Self {
            center: NFZ_CENTER,
            radius: NFZ_RADIUS,
        }
    }
}

impl NoFlyZone {
    pub fn distance_to_center(&self, position: &Position) -> f64 {
        position.distance_to(&self.center)
    }

    /// Check whether a position lies inside or on the zone boundary.
    ///
    /// Non-finite coordinates never violate.
    pub fn contains(&self, position: &Position) -> bool {
        self.distance_to_center(position) <= self.radius
    }

    /// Return one event per drone inside the zone, stamped with `now`.
    pub fn detect(&self, snapshot: &[DroneSnapshotEntry], now: DateTime<Utc>) -> Vec<ViolationEvent> {
        snapshot
            .iter()
            .filter_map(|drone| {
                let distance = self.distance_to_center(&drone.position);
                (distance <= self.radius).then(|| ViolationEvent {
                    drone_serial: drone.serial_number.clone(),
                    distance_to_center: distance,
                    detected_at: now,
                })
            })
            .collect()
    }
}

/// Detect violations against the default nest zone.
pub fn detect(snapshot: &[DroneSnapshotEntry], now: DateTime<Utc>) -> Vec<ViolationEvent> {
    NoFlyZone::default().detect(snapshot, now)
}
