//! Route handlers.

use std::sync::Arc;

use axum::{extract::State, response::Html, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use birdnest_core::ViolatorRecord;

use crate::render::render_page;
use crate::state::{AppState, CycleStatus};

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(violator_page))
        .route("/v1/violators", get(list_violators))
        .route("/health", get(health))
}

/// The violator page. A page view triggers a cycle unless one is running.
async fn violator_page(State(state): State<Arc<AppState>>) -> Html<String> {
    if state.refresh_on_view() {
        match state.poll_if_idle(Utc::now()).await {
            Some(Err(err)) => tracing::warn!("Page refresh cycle failed: {}", err),
            Some(Ok(_)) => {}
            None => tracing::trace!("Cycle already running, serving current view"),
        }
    }

    let records = state.violators(Utc::now()).await;
    Html(render_page(&records))
}

async fn list_violators(State(state): State<Arc<AppState>>) -> Json<Vec<ViolatorRecord>> {
    Json(state.violators(Utc::now()).await)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    #[serde(flatten)]
    cycle: CycleStatus,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let cycle = state.status();
    let status = if cycle.consecutive_failures == 0 { "ok" } else { "degraded" };
    Json(HealthResponse { status, cycle })
}
