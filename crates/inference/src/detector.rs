use std::sync::Arc;

use async_trait::async_trait;
use railwatch_core::detection::Detection;
use railwatch_core::video::Frame;

use crate::error::InferenceError;

/// A loaded object-detection model.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Detect objects in one frame. Output order carries no meaning.
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, InferenceError>;
}

/// Loads (or connects to) a model and hands back a ready [`Detector`].
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn Detector>, InferenceError>;
}
