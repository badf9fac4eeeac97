//! Birdnest core: no-fly zone detection and the recent-violator registry.

pub mod geofence;
pub mod models;
pub mod registry;
pub mod rules;

pub use geofence::{detect, NoFlyZone, NFZ_CENTER, NFZ_RADIUS};
pub use models::{
    DroneSnapshot, DroneSnapshotEntry, PilotRecord, Position, ViolationEvent, ViolatorRecord,
};
pub use registry::{default_retention, MergeSummary, ViolatorRegistry, DEFAULT_RETENTION_SECS};
pub use rules::MonitorRules;
