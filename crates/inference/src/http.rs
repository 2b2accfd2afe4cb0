//! HTTP client for an object-detection inference server.
//!
//! Wire contract:
//!
//! ```text
//! GET  {base_url}/models/{model}   -> 2xx once the model is loaded
//! POST {base_url}/detect           {model, device, image: <data URL>}
//!                                  -> [{ "label": "person", "score": 0.93 }, ...]
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use railwatch_core::detection::Detection;
use railwatch_core::video::Frame;
use serde::Serialize;

use crate::config::InferenceConfig;
use crate::detector::{Detector, ModelLoader};
use crate::error::InferenceError;

/// Loads a model on the inference server and returns an [`HttpDetector`].
pub struct HttpModelLoader {
    client: reqwest::Client,
    base_url: String,
    model: String,
    device: String,
}

/// Detector bound to one model on the inference server.
pub struct HttpDetector {
    client: reqwest::Client,
    base_url: String,
    model: String,
    device: String,
}

/// Body of `POST /detect`.
#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    model: &'a str,
    device: &'a str,
    image: String,
}

impl HttpModelLoader {
    pub fn new(config: &InferenceConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create a loader reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &InferenceConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            device: config.device.clone(),
        }
    }
}

#[async_trait]
impl ModelLoader for HttpModelLoader {
    async fn load(&self) -> Result<Arc<dyn Detector>, InferenceError> {
        let response = self
            .client
            .get(format!("{}/models/{}", self.base_url, self.model))
            .query(&[("device", self.device.as_str())])
            .send()
            .await
            .map_err(unavailable)?;
        ensure_success(response).await?;

        tracing::info!(model = %self.model, device = %self.device, "Inference model ready");

        Ok(Arc::new(HttpDetector {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            device: self.device.clone(),
        }))
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, InferenceError> {
        let body = DetectRequest {
            model: &self.model,
            device: &self.device,
            image: to_data_url(frame),
        };

        let response = self
            .client
            .post(format!("{}/detect", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(unavailable)?;
        let response = ensure_success(response).await?;

        let detections = response
            .json::<Vec<Detection>>()
            .await
            .map_err(unavailable)?;

        tracing::debug!(
            offset_secs = frame.offset_secs,
            count = detections.len(),
            "Frame detections received",
        );
        Ok(detections)
    }
}

/// Encode a frame as a `data:` URL, the image form the server accepts.
pub fn to_data_url(frame: &Frame) -> String {
    format!(
        "data:{};base64,{}",
        frame.mime_type,
        base64::engine::general_purpose::STANDARD.encode(&frame.image)
    )
}

fn unavailable(err: reqwest::Error) -> InferenceError {
    InferenceError::Unavailable(err.to_string())
}

/// Map a non-2xx response to [`InferenceError::Unavailable`] with the body
/// attached for debugging.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, InferenceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(InferenceError::Unavailable(format!(
        "inference server returned {}: {body}",
        status.as_u16()
    )))
}
