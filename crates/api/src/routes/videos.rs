use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;

use crate::handlers::videos;
use crate::state::AppState;

/// Largest accepted upload (512 MiB).
pub const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Routes mounted at `/videos`.
///
/// ```text
/// POST   /                -> upload_video (multipart, field `video`)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(videos::upload_video))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
