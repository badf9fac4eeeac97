use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use serde_json::Value;
use tower::ServiceExt;

use birdnest_core::{
    DroneSnapshot, DroneSnapshotEntry, MonitorRules, PilotRecord, ViolatorRecord, ViolatorRegistry,
};
use birdnest_feed::{DroneFeed, FetchError, PilotDirectory};

use crate::api;
use crate::cycle::PollCycle;
use crate::persistence::MemoryStore;
use crate::state::AppState;

struct OneDroneFeed {
    up: AtomicBool,
}

#[async_trait]
impl DroneFeed for OneDroneFeed {
    async fn fetch_snapshot(&self) -> Result<DroneSnapshot, FetchError> {
        if !self.up.load(Ordering::SeqCst) {
            return Err(FetchError::parse("drone snapshot", "truncated report"));
        }
        Ok(DroneSnapshot {
            drones: vec![DroneSnapshotEntry::new("SN-api", 250_000.0, 262_340.0)],
            ..DroneSnapshot::default()
        })
    }
}

struct OnePilot;

#[async_trait]
impl PilotDirectory for OnePilot {
    async fn resolve(&self, drone_serial: &str) -> Result<PilotRecord, FetchError> {
        if drone_serial != "SN-api" {
            return Err(FetchError::NotFound {
                serial: drone_serial.to_string(),
            });
        }
        Ok(pilot("P-api", "Liisa"))
    }
}

fn pilot(id: &str, first_name: &str) -> PilotRecord {
    PilotRecord {
        pilot_id: id.to_string(),
        first_name: first_name.to_string(),
        last_name: "Mäkinen".to_string(),
        phone_number: "+358447654321".to_string(),
        email: "liisa@example.com".to_string(),
        created_dt: None,
    }
}

fn setup(up: bool, refresh_on_view: bool, seeded: &ViolatorRegistry) -> Arc<AppState> {
    let cycle = PollCycle::new(
        Arc::new(OneDroneFeed {
            up: AtomicBool::new(up),
        }),
        Arc::new(OnePilot),
        Arc::new(MemoryStore::with_registry(seeded).expect("seed store")),
        MonitorRules::default(),
    );
    Arc::new(AppState::new(cycle).with_refresh_on_view(refresh_on_view))
}

async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, Vec<u8>) {
    let app = api::routes().with_state(state);
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    (status, bytes.to_vec())
}

#[tokio::test]
async fn page_view_runs_a_cycle() {
    let state = setup(true, true, &ViolatorRegistry::new());

    let (status, body) = get(state.clone(), "/").await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("Pilot: Liisa Mäkinen"));
    assert!(html.contains("Closest distance to the nest: 12.34 meters."));
    assert_eq!(state.status().cycles_completed, 1);
}

#[tokio::test]
async fn page_without_refresh_shows_loaded_view() {
    let state = setup(true, false, &ViolatorRegistry::new());

    let (status, body) = get(state.clone(), "/").await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("No drones seen in the NFZ for 10 minutes"));
    assert_eq!(state.status().cycles_completed, 0);
}

#[tokio::test]
async fn stale_records_are_hidden_while_upstream_is_down() {
    let seeded: ViolatorRegistry = vec![
        ViolatorRecord {
            pilot: pilot("P-old", "Vanha"),
            time_of_violation: Utc::now() - Duration::minutes(11),
            closest_distance: 100.0,
        },
        ViolatorRecord {
            pilot: pilot("P-new", "Uusi"),
            time_of_violation: Utc::now() - Duration::minutes(1),
            closest_distance: 200.0,
        },
    ]
    .into_iter()
    .collect();
    let state = setup(false, true, &seeded);
    state.load_view().await;
    get(state.clone(), "/").await;

    let (status, body) = get(state.clone(), "/v1/violators").await;
    assert_eq!(status, StatusCode::OK);
    let listed: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["pilotId"], "P-new");
    assert_eq!(state.status().cycles_failed, 1);
}

#[tokio::test]
async fn health_reports_degraded_after_failure() {
    let state = setup(false, true, &ViolatorRegistry::new());
    get(state.clone(), "/").await;

    let (status, body) = get(state, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["consecutive_failures"], 1);
    assert!(health["last_error"]
        .as_str()
        .unwrap()
        .contains("snapshot fetch failed"));
}

#[tokio::test]
async fn violators_endpoint_returns_records() {
    let state = setup(true, false, &ViolatorRegistry::new());
    state.poll(Utc::now() - Duration::seconds(5)).await.unwrap();

    let (_, body) = get(state, "/v1/violators").await;
    let listed: Vec<ViolatorRecord> = serde_json::from_slice(&body).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].pilot.pilot_id, "P-api");
    assert_eq!(listed[0].closest_distance, 12_340.0);
}
