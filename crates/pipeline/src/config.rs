use railwatch_core::detection::DEFAULT_FALL_THRESHOLD;
use railwatch_core::sampler::DEFAULT_INTERVAL_SECS;
use railwatch_core::scheduling::DEFAULT_MAX_CONSECUTIVE_FAILURES;

/// Location written on alerts raised from uploaded video.
pub const DEFAULT_ALERT_LOCATION: &str = "Video Analysis";

/// Processing job settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Seconds between sampled frames (default: `1.0`).
    pub frame_interval_secs: f64,
    /// Person score a detection must exceed to count as a fall (default: `0.5`).
    pub fall_threshold: f64,
    /// Consecutive inference failures that fail a job (default: `3`).
    pub max_consecutive_failures: u32,
    /// `location` field of emitted alerts (default: `Video Analysis`).
    pub alert_location: String,
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default          |
    /// |-----------------------------|------------------|
    /// | `FRAME_INTERVAL_SECS`       | `1.0`            |
    /// | `FALL_CONFIDENCE_THRESHOLD` | `0.5`            |
    /// | `MAX_CONSECUTIVE_FAILURES`  | `3`              |
    /// | `ALERT_LOCATION`            | `Video Analysis` |
    pub fn from_env() -> Self {
        let frame_interval_secs: f64 = std::env::var("FRAME_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_INTERVAL_SECS.to_string())
            .parse()
            .expect("FRAME_INTERVAL_SECS must be a valid number");

        let fall_threshold: f64 = std::env::var("FALL_CONFIDENCE_THRESHOLD")
            .unwrap_or_else(|_| DEFAULT_FALL_THRESHOLD.to_string())
            .parse()
            .expect("FALL_CONFIDENCE_THRESHOLD must be a valid number");

        let max_consecutive_failures: u32 = std::env::var("MAX_CONSECUTIVE_FAILURES")
            .unwrap_or_else(|_| DEFAULT_MAX_CONSECUTIVE_FAILURES.to_string())
            .parse()
            .expect("MAX_CONSECUTIVE_FAILURES must be a valid u32");

        let alert_location =
            std::env::var("ALERT_LOCATION").unwrap_or_else(|_| DEFAULT_ALERT_LOCATION.into());

        Self {
            frame_interval_secs,
            fall_threshold,
            max_consecutive_failures,
            alert_location,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_interval_secs: DEFAULT_INTERVAL_SECS,
            fall_threshold: DEFAULT_FALL_THRESHOLD,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            alert_location: DEFAULT_ALERT_LOCATION.into(),
        }
    }
}
