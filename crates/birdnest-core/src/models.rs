//! Core data models for the Birdnest monitor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Planar position reported by the monitoring device.
///
/// The device covers a 500,000 x 500,000 square; positions outside it are
/// not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One drone as seen in a single snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneSnapshotEntry {
    pub serial_number: String,
    pub position: Position,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub altitude: Option<f64>,
}

impl DroneSnapshotEntry {
    /// Create an entry with only the fields detection needs.
    pub fn new(serial_number: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            serial_number: serial_number.into(),
            position: Position::new(x, y),
            model: None,
            manufacturer: None,
            altitude: None,
        }
    }
}

/// A full capture from the monitoring device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DroneSnapshot {
    /// Identifier of the device that produced the capture
    #[serde(default)]
    pub device_id: Option<String>,
    /// Capture time as reported upstream
    #[serde(default)]
    pub snapshot_timestamp: Option<DateTime<Utc>>,
    pub drones: Vec<DroneSnapshotEntry>,
}

/// A drone found inside the no-fly zone at one observation instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationEvent {
    pub drone_serial: String,
    pub distance_to_center: f64,
    pub detected_at: DateTime<Utc>,
}

/// Pilot identity and contact details, as returned by the pilot lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PilotRecord {
    pub pilot_id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    /// Registration time upstream, kept verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_dt: Option<String>,
}

impl PilotRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Persisted record of a pilot seen violating the zone recently.
///
/// Serialized flat: the pilot fields sit next to `timeOfViolation` and
/// `closestDistance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolatorRecord {
    #[serde(flatten)]
    pub pilot: PilotRecord,
    /// Most recent sighting inside the zone
    pub time_of_violation: DateTime<Utc>,
    /// Smallest distance to the zone center seen while retained
    pub closest_distance: f64,
}

impl ViolatorRecord {
    pub fn from_event(event: &ViolationEvent, pilot: PilotRecord) -> Self {
        Self {
            pilot,
            time_of_violation: event.detected_at,
            closest_distance: event.distance_to_center,
        }
    }

    pub fn pilot_id(&self) -> &str {
        &self.pilot.pilot_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pilot() -> PilotRecord {
        PilotRecord {
            pilot_id: "P-dv8qs1oLlt".to_string(),
            first_name: "Jamie".to_string(),
            last_name: "Lind".to_string(),
            phone_number: "+210541223491".to_string(),
            email: "jamie.lind@example.com".to_string(),
            created_dt: None,
        }
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!(b.distance_to(&a), 5.0);
    }

    #[test]
    fn pilot_uses_upstream_field_names() {
        let raw = r#"{
            "pilotId": "P-dv8qs1oLlt",
            "firstName": "Jamie",
            "lastName": "Lind",
            "phoneNumber": "+210541223491",
            "createdDt": "2022-08-06T01:49:11.442Z",
            "email": "jamie.lind@example.com"
        }"#;
        let parsed: PilotRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.pilot_id, "P-dv8qs1oLlt");
        assert_eq!(parsed.full_name(), "Jamie Lind");
        assert_eq!(parsed.created_dt.as_deref(), Some("2022-08-06T01:49:11.442Z"));
    }

    #[test]
    fn violator_record_serializes_flat() {
        let record = ViolatorRecord {
            pilot: pilot(),
            time_of_violation: Utc.with_ymd_and_hms(2023, 1, 13, 10, 0, 0).unwrap(),
            closest_distance: 5000.0,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["pilotId"], "P-dv8qs1oLlt");
        assert_eq!(value["closestDistance"], 5000.0);
        assert!(value.get("pilot").is_none());
        assert!(value.get("timeOfViolation").is_some());
    }
}
