//! Alert listing and acknowledgment for the alert UI.
//!
//! - `GET  /flocks/{flock_id}/alerts` – unacknowledged alerts (`?all=true`
//!   for the full log)
//! - `POST /alerts/{alert_id}/ack` – acknowledge one alert

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/flocks/{flock_id}/alerts", get(list))
        .route("/alerts/{alert_id}/ack", post(acknowledge))
}

#[derive(Debug, Deserialize)]
struct AlertsQuery {
    #[serde(default)]
    all: bool,
}

async fn list(
    Path(flock_id): Path<String>,
    Query(params): Query<AlertsQuery>,
    State(engine): State<AppState>,
) -> impl IntoResponse {
    // ---
    if params.all {
        Json(engine.get_alert_log(&flock_id))
    } else {
        Json(engine.get_active_alerts(&flock_id))
    }
}

async fn acknowledge(
    Path(alert_id): Path<Uuid>,
    State(engine): State<AppState>,
) -> impl IntoResponse {
    // ---
    engine.acknowledge_alert(alert_id).map(Json)
}
