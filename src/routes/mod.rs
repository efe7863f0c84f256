//! HTTP gateway for the flock health engine.
//!
//! Each sibling module exports a subrouter over the shared engine state; this
//! gateway merges them so `main.rs` does not need to know about individual
//! endpoints. Handlers only translate between JSON and [`Engine`] calls.

use std::sync::Arc;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json, Router};
use serde_json::json;

use crate::error::{InvalidConfig, NotFound, RejectedReason};
use crate::Engine;

mod alerts;
mod flocks;
mod health;
mod readings;
mod scores;

// ---

/// Shared state handed to every handler.
pub type AppState = Arc<Engine>;

pub fn router(engine: AppState) -> Router {
    // ---
    Router::new()
        .merge(readings::router())
        .merge(scores::router())
        .merge(alerts::router())
        .merge(flocks::router())
        .merge(health::router())
        .with_state(engine)
}

// ---

fn error_body(status: StatusCode, code: &str, message: String) -> Response {
    // ---
    (status, Json(json!({ "error": message, "code": code }))).into_response()
}

impl IntoResponse for RejectedReason {
    fn into_response(self) -> Response {
        // ---
        let status = match self {
            RejectedReason::OutOfOrder { .. } | RejectedReason::Duplicate(_) => {
                StatusCode::CONFLICT
            }
            RejectedReason::OutOfRange { .. } | RejectedReason::Partial { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        };
        error_body(status, self.code(), self.to_string())
    }
}

impl IntoResponse for InvalidConfig {
    fn into_response(self) -> Response {
        error_body(StatusCode::UNPROCESSABLE_ENTITY, "invalid_config", self.to_string())
    }
}

impl IntoResponse for NotFound {
    fn into_response(self) -> Response {
        error_body(StatusCode::NOT_FOUND, "not_found", self.to_string())
    }
}
