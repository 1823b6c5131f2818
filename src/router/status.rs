//! Liveness and metrics endpoints. Neither goes through identity resolution.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::AppState;

/// Liveness probe.
pub async fn health() -> &'static str {
    "I'm alive!"
}

/// Prometheus exposition.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
