//! Frame sampler: turns a stored video into a lazy, finite sequence of
//! frames taken at a fixed time cadence.
//!
//! A sequence yields `ceil(duration / interval)` frames at offsets
//! `0, interval, 2 * interval, ...`; a video shorter than one interval
//! yields exactly one frame at `t = 0`. Problems with the video as a whole
//! (missing, undecodable, zero duration) are reported up front by
//! [`FrameSampler::open`] / [`FrameSampler::sample`], never mid-iteration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::ffmpeg;
use crate::video::{Frame, VideoAsset};

/// Default sampling cadence in seconds.
pub const DEFAULT_INTERVAL_SECS: f64 = 1.0;

/// Absorbs float error in `duration / interval` so that e.g. 3.0 / 1.0
/// does not round up to four frames.
const FRAME_COUNT_EPSILON: f64 = 1e-9;

/// Errors raised by the sampler.
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    /// The video cannot be probed or has nothing to sample.
    #[error("unreadable video {locator}: {reason}")]
    UnreadableVideo { locator: String, reason: String },

    /// A single frame failed to decode.
    #[error("failed to decode frame at {offset_secs:.3}s: {reason}")]
    Decode { offset_secs: f64, reason: String },

    #[error("invalid sampling interval {0}; must be a positive number of seconds")]
    InvalidInterval(f64),
}

impl From<SamplerError> for CoreError {
    fn from(err: SamplerError) -> Self {
        match err {
            SamplerError::UnreadableVideo { .. } => CoreError::UnreadableVideo(err.to_string()),
            SamplerError::Decode { .. } => CoreError::Internal(err.to_string()),
            SamplerError::InvalidInterval(_) => CoreError::Validation(err.to_string()),
        }
    }
}

/// Container-level facts needed to build a [`VideoAsset`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
}

/// Decoding backend used by the sampler.
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    /// Read duration and dimensions without decoding frames.
    async fn probe(&self, path: &Path) -> Result<VideoInfo, SamplerError>;

    /// Decode the single frame nearest to `offset_secs`.
    async fn decode_at(&self, path: &Path, offset_secs: f64) -> Result<Frame, SamplerError>;
}

/// [`FrameDecoder`] backed by the `ffprobe` / `ffmpeg` binaries.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegDecoder;

#[async_trait]
impl FrameDecoder for FfmpegDecoder {
    async fn probe(&self, path: &Path) -> Result<VideoInfo, SamplerError> {
        let unreadable = |reason: String| SamplerError::UnreadableVideo {
            locator: path.to_string_lossy().to_string(),
            reason,
        };

        let probe = ffmpeg::probe_video(path)
            .await
            .map_err(|e| unreadable(e.to_string()))?;
        if !ffmpeg::has_video_stream(&probe) {
            return Err(unreadable("no video stream".into()));
        }

        let (width, height) = ffmpeg::parse_resolution(&probe);
        Ok(VideoInfo {
            duration_secs: ffmpeg::parse_duration(&probe),
            width,
            height,
        })
    }

    async fn decode_at(&self, path: &Path, offset_secs: f64) -> Result<Frame, SamplerError> {
        let image = ffmpeg::extract_frame_jpeg(path, offset_secs)
            .await
            .map_err(|e| SamplerError::Decode {
                offset_secs,
                reason: e.to_string(),
            })?;
        Ok(Frame::jpeg(offset_secs, image))
    }
}

/// Number of frames sampled from a video of `duration_secs` at
/// `interval_secs`: `ceil(D / I)`, at least one for any positive duration.
pub fn frame_count(duration_secs: f64, interval_secs: f64) -> usize {
    if !duration_secs.is_finite() || !interval_secs.is_finite() {
        return 0;
    }
    if duration_secs <= 0.0 || interval_secs <= 0.0 {
        return 0;
    }
    let raw = duration_secs / interval_secs - FRAME_COUNT_EPSILON;
    (raw.ceil() as usize).max(1)
}

/// Opens videos and produces frame sequences over them.
#[derive(Clone)]
pub struct FrameSampler {
    decoder: Arc<dyn FrameDecoder>,
}

impl FrameSampler {
    pub fn new(decoder: Arc<dyn FrameDecoder>) -> Self {
        Self { decoder }
    }

    /// Sampler using the system `ffmpeg` binaries.
    pub fn ffmpeg() -> Self {
        Self::new(Arc::new(FfmpegDecoder))
    }

    /// Probe stored bytes and describe them as a [`VideoAsset`].
    pub async fn open(
        &self,
        locator: impl Into<String>,
        path: PathBuf,
    ) -> Result<VideoAsset, SamplerError> {
        let locator = locator.into();
        let info = self
            .decoder
            .probe(&path)
            .await
            .map_err(|e| match e {
                SamplerError::UnreadableVideo { reason, .. } => SamplerError::UnreadableVideo {
                    locator: locator.clone(),
                    reason,
                },
                other => other,
            })?;

        if !info.duration_secs.is_finite() {
            return Err(SamplerError::UnreadableVideo {
                locator,
                reason: format!("invalid duration {}", info.duration_secs),
            });
        }

        Ok(VideoAsset {
            locator,
            path,
            duration_secs: info.duration_secs,
            width: info.width,
            height: info.height,
        })
    }

    /// Start a fresh, lazy frame sequence over `video`.
    ///
    /// Fails with [`SamplerError::UnreadableVideo`] for a zero-length video
    /// so callers see the problem before any frame is requested.
    pub fn sample(
        &self,
        video: &VideoAsset,
        interval_secs: f64,
    ) -> Result<FrameSequence, SamplerError> {
        if !interval_secs.is_finite() || interval_secs <= 0.0 {
            return Err(SamplerError::InvalidInterval(interval_secs));
        }
        let total = frame_count(video.duration_secs, interval_secs);
        if total == 0 {
            return Err(SamplerError::UnreadableVideo {
                locator: video.locator.clone(),
                reason: format!("duration {}s has no frames to sample", video.duration_secs),
            });
        }

        Ok(FrameSequence {
            decoder: Arc::clone(&self.decoder),
            path: video.path.clone(),
            interval_secs,
            next_index: 0,
            total,
        })
    }
}

/// Lazy sequence of frames from one video.
///
/// Not restartable; call [`FrameSampler::sample`] again for a fresh decode.
/// Dropping it mid-way is safe: an in-flight decode future owns its child
/// process, which is killed when the future is dropped.
pub struct FrameSequence {
    decoder: Arc<dyn FrameDecoder>,
    path: PathBuf,
    interval_secs: f64,
    next_index: usize,
    total: usize,
}

impl std::fmt::Debug for FrameSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSequence")
            .field("path", &self.path)
            .field("interval_secs", &self.interval_secs)
            .field("next_index", &self.next_index)
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}

impl FrameSequence {
    /// Number of frames the sequence will attempt in total.
    pub fn total_frames(&self) -> usize {
        self.total
    }

    /// Number of offsets consumed so far, decoded or skipped.
    pub fn position(&self) -> usize {
        self.next_index
    }

    /// Offset of the frame the next call to [`next_frame`](Self::next_frame)
    /// will decode, if any remain.
    pub fn next_offset(&self) -> Option<f64> {
        (self.next_index < self.total).then(|| self.next_index as f64 * self.interval_secs)
    }

    /// Decode the next frame. Returns `None` once the sequence is exhausted.
    ///
    /// A frame that fails to decode is skipped with a warning and the
    /// following offset is tried.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        while let Some(offset_secs) = self.next_offset() {
            self.next_index += 1;
            match self.decoder.decode_at(&self.path, offset_secs).await {
                Ok(mut frame) => {
                    frame.offset_secs = offset_secs;
                    return Some(frame);
                }
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        offset_secs,
                        error = %e,
                        "Skipping undecodable frame",
                    );
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use assert_matches::assert_matches;

    use super::*;

    /// Decoder with a fixed duration that records every decode request.
    struct FakeDecoder {
        info: Result<VideoInfo, String>,
        broken_offsets: HashSet<u64>,
        decoded: Mutex<Vec<f64>>,
    }

    impl FakeDecoder {
        fn with_duration(duration_secs: f64) -> Self {
            Self {
                info: Ok(VideoInfo {
                    duration_secs,
                    width: 640,
                    height: 360,
                }),
                broken_offsets: HashSet::new(),
                decoded: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl FrameDecoder for FakeDecoder {
        async fn probe(&self, path: &Path) -> Result<VideoInfo, SamplerError> {
            self.info.clone().map_err(|reason| SamplerError::UnreadableVideo {
                locator: path.display().to_string(),
                reason,
            })
        }

        async fn decode_at(&self, _path: &Path, offset_secs: f64) -> Result<Frame, SamplerError> {
            self.decoded.lock().unwrap().push(offset_secs);
            if self.broken_offsets.contains(&(offset_secs as u64)) {
                return Err(SamplerError::Decode {
                    offset_secs,
                    reason: "corrupt packet".into(),
                });
            }
            Ok(Frame::jpeg(offset_secs, vec![0xFF, 0xD8]))
        }
    }

    async fn open_with(decoder: Arc<FakeDecoder>) -> (FrameSampler, VideoAsset) {
        let sampler = FrameSampler::new(decoder);
        let video = sampler
            .open("http://files/videos/1_clip.mp4", PathBuf::from("/tmp/clip.mp4"))
            .await
            .unwrap();
        (sampler, video)
    }

    async fn collect(mut seq: FrameSequence) -> Vec<f64> {
        let mut offsets = Vec::new();
        while let Some(frame) = seq.next_frame().await {
            offsets.push(frame.offset_secs);
        }
        offsets
    }

    #[test]
    fn frame_count_is_ceiling_of_duration_over_interval() {
        assert_eq!(frame_count(3.0, 1.0), 3);
        assert_eq!(frame_count(3.2, 1.0), 4);
        assert_eq!(frame_count(10.0, 2.5), 4);
        assert_eq!(frame_count(0.4, 1.0), 1);
        assert_eq!(frame_count(0.3, 0.1), 3);
        assert_eq!(frame_count(0.0, 1.0), 0);
        assert_eq!(frame_count(-1.0, 1.0), 0);
        assert_eq!(frame_count(f64::NAN, 1.0), 0);
        assert_eq!(frame_count(f64::INFINITY, 1.0), 0);
        assert_eq!(frame_count(3.0, f64::INFINITY), 0);
    }

    #[tokio::test]
    async fn yields_frames_at_fixed_cadence() {
        let (sampler, video) = open_with(Arc::new(FakeDecoder::with_duration(3.0))).await;
        assert_eq!(video.width, 640);

        let seq = sampler.sample(&video, DEFAULT_INTERVAL_SECS).unwrap();
        assert_eq!(seq.total_frames(), 3);
        assert_eq!(collect(seq).await, vec![0.0, 1.0, 2.0]);
    }

    #[tokio::test]
    async fn short_video_yields_single_frame_at_zero() {
        let (sampler, video) = open_with(Arc::new(FakeDecoder::with_duration(0.4))).await;
        let seq = sampler.sample(&video, 1.0).unwrap();
        assert_eq!(collect(seq).await, vec![0.0]);
    }

    #[tokio::test]
    async fn zero_duration_is_unreadable_up_front() {
        let (sampler, video) = open_with(Arc::new(FakeDecoder::with_duration(0.0))).await;
        assert_matches!(
            sampler.sample(&video, 1.0),
            Err(SamplerError::UnreadableVideo { .. })
        );
    }

    #[tokio::test]
    async fn infinite_duration_fails_open() {
        for duration in [f64::INFINITY, f64::NAN] {
            let sampler = FrameSampler::new(Arc::new(FakeDecoder::with_duration(duration)));
            let err = sampler
                .open("http://files/videos/3_live.mp4", PathBuf::from("/tmp/live.mp4"))
                .await
                .unwrap_err();
            assert_matches!(
                err,
                SamplerError::UnreadableVideo { locator, .. }
                    if locator == "http://files/videos/3_live.mp4"
            );
        }
    }

    #[tokio::test]
    async fn undecodable_video_fails_open() {
        let decoder = FakeDecoder {
            info: Err("moov atom not found".into()),
            ..FakeDecoder::with_duration(0.0)
        };
        let sampler = FrameSampler::new(Arc::new(decoder));
        let err = sampler
            .open("http://files/videos/2_bad.mp4", PathBuf::from("/tmp/bad.mp4"))
            .await
            .unwrap_err();
        assert_matches!(
            err,
            SamplerError::UnreadableVideo { ref locator, .. } if locator == "http://files/videos/2_bad.mp4"
        );
        assert_matches!(CoreError::from(err), CoreError::UnreadableVideo(_));
    }

    #[tokio::test]
    async fn rejects_non_positive_interval() {
        let (sampler, video) = open_with(Arc::new(FakeDecoder::with_duration(3.0))).await;
        assert_matches!(sampler.sample(&video, 0.0), Err(SamplerError::InvalidInterval(_)));
        assert_matches!(sampler.sample(&video, -1.0), Err(SamplerError::InvalidInterval(_)));
    }

    #[tokio::test]
    async fn broken_frame_is_skipped() {
        let decoder = Arc::new(FakeDecoder {
            broken_offsets: HashSet::from([1]),
            ..FakeDecoder::with_duration(3.0)
        });
        let (sampler, video) = open_with(Arc::clone(&decoder)).await;
        let offsets = collect(sampler.sample(&video, 1.0).unwrap()).await;
        assert_eq!(offsets, vec![0.0, 2.0]);
        assert_eq!(*decoder.decoded.lock().unwrap(), vec![0.0, 1.0, 2.0]);
    }

    #[tokio::test]
    async fn abandoned_sequence_decodes_nothing_further() {
        let decoder = Arc::new(FakeDecoder::with_duration(10.0));
        let (sampler, video) = open_with(Arc::clone(&decoder)).await;

        let mut seq = sampler.sample(&video, 1.0).unwrap();
        seq.next_frame().await.unwrap();
        seq.next_frame().await.unwrap();
        drop(seq);

        assert_eq!(decoder.decoded.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn each_sample_call_starts_fresh() {
        let (sampler, video) = open_with(Arc::new(FakeDecoder::with_duration(2.0))).await;
        let first = collect(sampler.sample(&video, 1.0).unwrap()).await;
        let second = collect(sampler.sample(&video, 1.0).unwrap()).await;
        assert_eq!(first, second);
    }
}
