use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use railwatch_core::records::Collection;
use railwatch_sync::Keyed;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/alerts
///
/// All stored alerts, newest first.
pub async fn list_alerts(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let snapshot = state.store.snapshot(Collection::Alerts).await?;
    let alerts: Vec<_> = snapshot
        .alerts()
        .into_iter()
        .map(|(key, record)| Keyed { key, record })
        .collect();
    Ok(Json(DataResponse { data: alerts }))
}
