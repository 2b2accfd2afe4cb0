//! Handlers for video processing jobs.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use railwatch_core::types::JobId;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/jobs
///
/// Running and recently finished jobs, most recently started first.
pub async fn list_jobs(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(DataResponse {
        data: state.scheduler.list(),
    }))
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let status = state.scheduler.status(id)?;
    Ok(Json(DataResponse { data: status }))
}

/// POST /api/v1/jobs/{id}/cancel
///
/// Request cancellation. The job stops at its next frame boundary; the
/// returned status is the one observed when the request was made.
/// Cancelling a finished job is a no-op.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let status = state.scheduler.cancel(id)?;
    Ok(Json(DataResponse { data: status }))
}
