//! Pipeline-facing inference entry point.
//!
//! The model is loaded lazily on the first call and memoized for the life
//! of the adapter. A failed load is not memoized, so the next call tries
//! again. Each call, load included, runs under a single deadline.

use std::sync::Arc;
use std::time::Duration;

use railwatch_core::detection::Detection;
use railwatch_core::video::Frame;
use tokio::sync::OnceCell;

use crate::detector::{Detector, ModelLoader};
use crate::error::InferenceError;

/// Default per-call deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline-bounded, lazily loaded detector.
pub struct InferenceAdapter {
    loader: Arc<dyn ModelLoader>,
    model: OnceCell<Arc<dyn Detector>>,
    timeout: Duration,
}

impl InferenceAdapter {
    pub fn new(loader: Arc<dyn ModelLoader>, timeout: Duration) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the model has been loaded successfully.
    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// Run detection on one frame.
    ///
    /// Returns [`InferenceError::Unavailable`] when the model cannot be
    /// loaded or invoked and [`InferenceError::Timeout`] when the call
    /// overruns the deadline.
    pub async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, InferenceError> {
        let call = async {
            let model = self.model().await?;
            model.detect(frame).await
        };

        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    offset_secs = frame.offset_secs,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Inference call timed out",
                );
                Err(InferenceError::Timeout(self.timeout))
            }
        }
    }

    async fn model(&self) -> Result<&Arc<dyn Detector>, InferenceError> {
        self.model
            .get_or_try_init(|| async {
                tracing::info!("Loading detection model");
                let loaded = self.loader.load().await;
                match &loaded {
                    Ok(_) => tracing::info!("Detection model loaded"),
                    Err(e) => tracing::error!(error = %e, "Failed to load detection model"),
                }
                loaded
            })
            .await
    }
}
