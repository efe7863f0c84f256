//! Sensor reading ingest and raw reading history.
//!
//! - `POST /flocks/{flock_id}/readings` – ingest one reading
//! - `GET  /flocks/{flock_id}/readings?from=..&to=..` – accepted readings

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use tracing::{debug, info};

use super::AppState;
use crate::models::{RawReading, TimeWindow};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/flocks/{flock_id}/readings", post(ingest).get(list))
}

async fn ingest(
    Path(flock_id): Path<String>,
    State(engine): State<AppState>,
    Json(raw): Json<RawReading>,
) -> impl IntoResponse {
    // ---
    debug!("POST /flocks/{}/readings at {}", flock_id, raw.timestamp);

    match engine.ingest_raw(&flock_id, &raw) {
        Ok(accepted) => {
            if let Some(alert) = &accepted.alert {
                info!(
                    "Flock {} raised {:?} alert at score {:.1}",
                    flock_id, alert.severity, alert.triggering_score
                );
            }
            (StatusCode::CREATED, Json(accepted)).into_response()
        }
        Err(reason) => reason.into_response(),
    }
}

async fn list(
    Path(flock_id): Path<String>,
    Query(window): Query<TimeWindow>,
    State(engine): State<AppState>,
) -> impl IntoResponse {
    // ---
    debug!("GET /flocks/{}/readings {:?}", flock_id, window);
    Json(engine.get_readings(&flock_id, window.from, window.to))
}
