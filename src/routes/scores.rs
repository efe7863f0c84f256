//! Health score queries used by the dashboard and chart renderer.
//!
//! - `GET /flocks/{flock_id}/score` – latest score
//! - `GET /flocks/{flock_id}/scores?from=..&to=..` – score history
//! - `GET /flocks/{flock_id}/onset?from=..&to=..` – anomaly onset
//! - `GET /flocks/{flock_id}/trend?from=..&to=..` – score trend
//! - `GET /flocks/{flock_id}/summary` – live metric cards

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::AppState;
use crate::models::{TimeWindow, Trend};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/flocks/{flock_id}/score", get(current))
        .route("/flocks/{flock_id}/scores", get(history))
        .route("/flocks/{flock_id}/onset", get(onset))
        .route("/flocks/{flock_id}/trend", get(trend))
        .route("/flocks/{flock_id}/summary", get(summary))
}

#[derive(Serialize)]
struct OnsetResponse {
    flock_id: String,
    onset: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct TrendResponse {
    flock_id: String,
    trend: Option<Trend>,
}

async fn current(
    Path(flock_id): Path<String>,
    State(engine): State<AppState>,
) -> impl IntoResponse {
    // ---
    engine.get_current_score(&flock_id).map(Json)
}

async fn history(
    Path(flock_id): Path<String>,
    Query(window): Query<TimeWindow>,
    State(engine): State<AppState>,
) -> impl IntoResponse {
    // ---
    debug!("GET /flocks/{}/scores {:?}", flock_id, window);
    Json(engine.get_score_history(&flock_id, window.from, window.to))
}

async fn onset(
    Path(flock_id): Path<String>,
    Query(window): Query<TimeWindow>,
    State(engine): State<AppState>,
) -> impl IntoResponse {
    // ---
    let onset = engine.get_onset(&flock_id, &window);
    Json(OnsetResponse { flock_id, onset })
}

async fn trend(
    Path(flock_id): Path<String>,
    Query(window): Query<TimeWindow>,
    State(engine): State<AppState>,
) -> impl IntoResponse {
    // ---
    let trend = engine.get_trend(&flock_id, &window);
    Json(TrendResponse { flock_id, trend })
}

async fn summary(
    Path(flock_id): Path<String>,
    State(engine): State<AppState>,
) -> impl IntoResponse {
    // ---
    engine.get_summary(&flock_id).map(Json)
}
