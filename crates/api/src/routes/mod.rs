pub mod alerts;
pub mod health;
pub mod jobs;
pub mod reports;
pub mod videos;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                          WebSocket (dashboard updates + events)
///
/// /videos                      upload (POST)
///
/// /jobs                        list
/// /jobs/{id}                   get
/// /jobs/{id}/cancel            cancel (POST)
///
/// /alerts                      list
///
/// /reports                     list, create
/// /reports/{key}/status        update (PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/videos", videos::router())
        .nest("/jobs", jobs::router())
        .nest("/alerts", alerts::router())
        .nest("/reports", reports::router())
}
