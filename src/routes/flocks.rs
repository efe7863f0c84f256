//! Flock registry and farm-management controls.
//!
//! - `GET    /flocks` – monitored flock ids
//! - `GET    /flocks/{flock_id}/config` – current alert configuration
//! - `PUT    /flocks/{flock_id}/config` – set flock size and sensitivity
//! - `DELETE /flocks/{flock_id}` – retire a flock

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;

use super::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/flocks", get(list))
        .route("/flocks/{flock_id}", delete(retire))
        .route("/flocks/{flock_id}/config", get(get_config).put(set_config))
}

/// Body of `PUT /flocks/{flock_id}/config`.
#[derive(Debug, Deserialize)]
struct ConfigRequest {
    flock_size: i64,
    sensitivity: String,
}

async fn list(State(engine): State<AppState>) -> impl IntoResponse {
    Json(engine.flock_ids())
}

async fn get_config(
    Path(flock_id): Path<String>,
    State(engine): State<AppState>,
) -> impl IntoResponse {
    // ---
    engine.get_config(&flock_id).map(Json)
}

async fn set_config(
    Path(flock_id): Path<String>,
    State(engine): State<AppState>,
    Json(body): Json<ConfigRequest>,
) -> impl IntoResponse {
    // ---
    engine
        .set_config(&flock_id, body.flock_size, &body.sensitivity)
        .map(Json)
}

async fn retire(Path(flock_id): Path<String>, State(engine): State<AppState>) -> impl IntoResponse {
    // ---
    engine
        .retire_flock(&flock_id)
        .map(|()| StatusCode::NO_CONTENT)
}
