use axum::routing::{get, put};
use axum::Router;

use crate::handlers::reports;
use crate::state::AppState;

/// Routes mounted at `/reports`.
///
/// ```text
/// GET    /                -> list_reports
/// POST   /                -> create_report
/// PUT    /{key}/status    -> update_report_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(reports::list_reports).post(reports::create_report))
        .route("/{key}/status", put(reports::update_report_status))
}
