//! Decoding of the monitoring-device XML report.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use birdnest_core::{DroneSnapshot, DroneSnapshotEntry, Position};

use crate::error::FetchError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportXml {
    #[serde(default)]
    device_information: Option<DeviceInformationXml>,
    capture: CaptureXml,
}

#[derive(Debug, Deserialize)]
struct DeviceInformationXml {
    #[serde(rename = "@deviceId", default)]
    device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptureXml {
    #[serde(rename = "@snapshotTimestamp", default)]
    snapshot_timestamp: Option<String>,
    #[serde(rename = "drone", default)]
    drones: Vec<DroneXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DroneXml {
    serial_number: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    manufacturer: Option<String>,
    position_x: f64,
    position_y: f64,
    #[serde(default)]
    altitude: Option<f64>,
}

impl From<DroneXml> for DroneSnapshotEntry {
    fn from(drone: DroneXml) -> Self {
        Self {
            serial_number: drone.serial_number.trim().to_string(),
            position: Position::new(drone.position_x, drone.position_y),
            model: drone.model,
            manufacturer: drone.manufacturer,
            altitude: drone.altitude,
        }
    }
}

/// Parse a device report into a snapshot.
///
/// Any malformed drone rejects the whole report.
pub fn parse_snapshot(xml: &str) -> Result<DroneSnapshot, FetchError> {
    let report: ReportXml =
        quick_xml::de::from_str(xml).map_err(|err| FetchError::parse("drone snapshot", err))?;

    let snapshot_timestamp = report
        .capture
        .snapshot_timestamp
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(DroneSnapshot {
        device_id: report.device_information.and_then(|info| info.device_id),
        snapshot_timestamp,
        drones: report
            .capture
            .drones
            .into_iter()
            .map(DroneSnapshotEntry::from)
            .collect(),
    })
}
