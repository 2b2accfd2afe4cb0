//! FFmpeg/FFprobe command utilities used by the frame sampler.
//!
//! Every child process is spawned with `kill_on_drop`, so abandoning a
//! probe or frame extraction future (e.g. when a job is cancelled or a
//! frame sequence is dropped mid-way) releases the decoder immediately.

use std::path::Path;

use serde::Deserialize;

/// Error type for FFmpeg/FFprobe operations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffprobe/ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffprobe/ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    #[error("video file not found: {0}")]
    VideoNotFound(String),

    #[error("ffmpeg produced no image data at {0:.3}s")]
    EmptyFrame(f64),
}

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
    pub format: FfprobeFormat,
}

/// A single stream from ffprobe output.
#[derive(Debug, Deserialize)]
pub struct FfprobeStream {
    pub index: i32,
    pub codec_name: Option<String>,
    pub codec_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<String>,
}

/// Format-level metadata from ffprobe.
#[derive(Debug, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
    pub format_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run `ffprobe` on a video file and return the parsed JSON output.
pub async fn probe_video(path: &Path) -> Result<FfprobeOutput, FfmpegError> {
    if !path.exists() {
        return Err(FfmpegError::VideoNotFound(
            path.to_string_lossy().to_string(),
        ));
    }

    let output = tokio::process::Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str::<FfprobeOutput>(&stdout)
        .map_err(|e| FfmpegError::ParseError(format!("{e}: {stdout}")))
}

/// Decode the frame at `timestamp_secs` and return it JPEG-encoded.
///
/// The image is written to stdout (`image2pipe`), nothing touches disk.
pub async fn extract_frame_jpeg(
    video_path: &Path,
    timestamp_secs: f64,
) -> Result<Vec<u8>, FfmpegError> {
    if !video_path.exists() {
        return Err(FfmpegError::VideoNotFound(
            video_path.to_string_lossy().to_string(),
        ));
    }

    let output = tokio::process::Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{timestamp_secs:.3}"), "-i"])
        .arg(video_path)
        .args([
            "-frames:v",
            "1",
            "-f",
            "image2pipe",
            "-vcodec",
            "mjpeg",
            "-q:v",
            "2",
            "pipe:1",
        ])
        .kill_on_drop(true)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    if output.stdout.is_empty() {
        return Err(FfmpegError::EmptyFrame(timestamp_secs));
    }

    Ok(output.stdout)
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Find the first video stream in the ffprobe output.
fn first_video_stream(probe: &FfprobeOutput) -> Option<&FfprobeStream> {
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
}

/// Whether the container has at least one video stream.
pub fn has_video_stream(probe: &FfprobeOutput) -> bool {
    first_video_stream(probe).is_some()
}

/// Parse the video duration in seconds from ffprobe output.
pub fn parse_duration(probe: &FfprobeOutput) -> f64 {
    // Try format-level duration first.
    if let Some(secs) = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite())
    {
        return secs;
    }
    // Fall back to the first video stream's duration.
    first_video_stream(probe)
        .and_then(|s| s.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite())
        .unwrap_or(0.0)
}

/// Find the first video stream's resolution.
pub fn parse_resolution(probe: &FfprobeOutput) -> (u32, u32) {
    first_video_stream(probe)
        .map(|s| (s.width.unwrap_or(0), s.height.unwrap_or(0)))
        .unwrap_or((0, 0))
}
