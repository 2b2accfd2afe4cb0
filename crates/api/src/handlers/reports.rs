//! Handlers for rider reports.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use railwatch_core::records::{Collection, NewReport, Report, ReportStatus, StatusChange};
use railwatch_core::types::RecordKey;
use railwatch_store::writer;
use railwatch_sync::Keyed;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PUT /reports/{key}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateReportStatus {
    pub status: String,
}

/// Response body for a status update.
#[derive(Debug, Serialize)]
pub struct ReportStatusUpdated {
    pub key: RecordKey,
    pub status: ReportStatus,
    /// `false` when the report already had the requested status.
    pub changed: bool,
}

/// POST /api/v1/reports
///
/// Store a rider report, stamped now and `pending`. Returns 201 with the
/// assigned key.
pub async fn create_report(
    State(state): State<AppState>,
    Json(input): Json<NewReport>,
) -> AppResult<impl IntoResponse> {
    let (key, record) = writer::submit_report(state.store.as_ref(), input).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: Keyed { key, record },
        }),
    ))
}

/// GET /api/v1/reports
///
/// All reports, newest first.
pub async fn list_reports(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let snapshot = state.store.snapshot(Collection::Reports).await?;
    let reports: Vec<Keyed<Report>> = snapshot
        .reports()
        .into_iter()
        .map(|(key, record)| Keyed { key, record })
        .collect();
    Ok(Json(DataResponse { data: reports }))
}

/// PUT /api/v1/reports/{key}/status
///
/// Move a report forward (`pending -> resolved`). Re-applying the current
/// status succeeds with `changed: false`; reopening is a 409.
pub async fn update_report_status(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(input): Json<UpdateReportStatus>,
) -> AppResult<impl IntoResponse> {
    let status: ReportStatus = input.status.parse()?;

    let change = match status {
        ReportStatus::Resolved => writer::resolve_report(state.store.as_ref(), &key).await?,
        ReportStatus::Pending => state.store.update_status(&key, status).await?,
    };

    tracing::info!(key = %key, status = %status, ?change, "Report status updated");

    Ok(Json(DataResponse {
        data: ReportStatusUpdated {
            key,
            status,
            changed: change == StatusChange::Changed,
        },
    }))
}
