use std::time::Duration;

use crate::adapter::DEFAULT_TIMEOUT;

/// Inference server connection settings.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Base URL of the inference server (default: `http://localhost:8000`).
    pub base_url: String,
    /// Model identifier (default: `Xenova/yolov8n`).
    pub model: String,
    /// Execution device hint passed to the server (default: `cpu`).
    pub device: String,
    /// Per-call deadline (default: 10 s).
    pub timeout: Duration,
}

impl InferenceConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `INFERENCE_URL`          | `http://localhost:8000` |
    /// | `INFERENCE_MODEL`        | `Xenova/yolov8n`        |
    /// | `INFERENCE_DEVICE`       | `cpu`                   |
    /// | `INFERENCE_TIMEOUT_SECS` | `10`                    |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let timeout_secs: u64 = std::env::var("INFERENCE_TIMEOUT_SECS")
            .ok()
            .map(|v| {
                v.parse()
                    .expect("INFERENCE_TIMEOUT_SECS must be a valid u64")
            })
            .unwrap_or(defaults.timeout.as_secs());

        Self {
            base_url: std::env::var("INFERENCE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("INFERENCE_MODEL").unwrap_or(defaults.model),
            device: std::env::var("INFERENCE_DEVICE").unwrap_or(defaults.device),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            model: "Xenova/yolov8n".into(),
            device: "cpu".into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}
