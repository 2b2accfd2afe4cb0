use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// `postgres` or `memory`.
    pub store: &'static str,
    pub running_jobs: usize,
    pub ws_connections: usize,
}

/// GET /health -- returns service status and pipeline load.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = if state.config.database_url.is_some() {
        "postgres"
    } else {
        "memory"
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        store,
        running_jobs: state.scheduler.running_count(),
        ws_connections: state.ws_manager.connection_count().await,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
