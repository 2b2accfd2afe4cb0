//! Video upload: store the bytes, probe them and start a processing job.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use railwatch_core::error::CoreError;
use railwatch_core::storage::StoredVideo;
use railwatch_pipeline::JobHandle;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Multipart field carrying the video file.
pub const VIDEO_FIELD: &str = "video";

/// POST /api/v1/videos
///
/// Accepts a multipart upload with a `video` file field. The file is stored
/// under `videos/{millis}_{name}`, probed, and a processing job is started.
/// Returns 202 with the job's initial status. A file that cannot be
/// processed is deleted again.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or("upload.mp4").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
        upload = Some((name, bytes.to_vec()));
        break;
    }

    let (name, bytes) = upload.ok_or_else(|| {
        AppError::BadRequest(format!("Missing multipart field '{VIDEO_FIELD}'"))
    })?;

    let stored = state.storage.store(&name, &bytes).await?;
    let job = match start_job(&state, &stored).await {
        Ok(job) => job,
        Err(e) => {
            state.storage.discard(&stored).await;
            return Err(e.into());
        }
    };

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse { data: job.status() }),
    ))
}

/// Open the stored file and start processing it. On error no job refers to
/// the file.
async fn start_job(state: &AppState, stored: &StoredVideo) -> Result<JobHandle, CoreError> {
    let video = state
        .sampler
        .open(stored.locator.clone(), stored.path.clone())
        .await?;

    tracing::info!(
        locator = %video.locator,
        duration_secs = video.duration_secs,
        size = stored.size_bytes,
        "Video uploaded",
    );

    Ok(state.scheduler.start(video)?)
}
