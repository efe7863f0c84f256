// src/routes/health.rs
//! Liveness endpoint for the flock health service.
//!
//! `GET /health` lets container orchestrators and CI pipelines verify that
//! the service is up. It reports how many flocks are monitored but never
//! touches per-flock state, so it cannot block behind an ingest.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    flocks: usize,
}

/// Handle `GET /health`.
async fn health(State(engine): State<AppState>) -> Json<HealthResponse> {
    // ---
    Json(HealthResponse {
        status: "ok",
        flocks: engine.flock_ids().len(),
    })
}

/// Create a subrouter containing the `/health` route.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
