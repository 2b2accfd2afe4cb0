use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use railwatch_api::config::ServerConfig;
use railwatch_api::routes;
use railwatch_api::state::AppState;
use railwatch_api::ws::WsManager;
use railwatch_core::detection::Detection;
use railwatch_core::sampler::{FrameDecoder, FrameSampler, SamplerError, VideoInfo};
use railwatch_core::storage::LocalVideoStorage;
use railwatch_core::video::Frame;
use railwatch_events::EventBus;
use railwatch_inference::{Detector, InferenceAdapter, InferenceError, ModelLoader};
use railwatch_pipeline::{PipelineConfig, ProcessingScheduler};
use railwatch_store::{AlertStore, MemoryStore};
use railwatch_sync::SyncConfig;

/// Duration every uploaded test clip probes as.
pub const CLIP_SECS: f64 = 3.0;

/// Uploads whose bytes are exactly this are reported as unreadable.
pub const CORRUPT_VIDEO: &[u8] = b"not a video";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Decoder that treats every file as a [`CLIP_SECS`] clip unless its bytes
/// equal [`CORRUPT_VIDEO`].
struct FakeDecoder;

#[async_trait]
impl FrameDecoder for FakeDecoder {
    async fn probe(&self, path: &Path) -> Result<VideoInfo, SamplerError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SamplerError::UnreadableVideo {
                locator: path.display().to_string(),
                reason: e.to_string(),
            })?;
        if bytes == CORRUPT_VIDEO {
            return Err(SamplerError::UnreadableVideo {
                locator: path.display().to_string(),
                reason: "moov atom not found".into(),
            });
        }
        Ok(VideoInfo {
            duration_secs: CLIP_SECS,
            width: 640,
            height: 360,
        })
    }

    async fn decode_at(&self, _path: &Path, offset_secs: f64) -> Result<Frame, SamplerError> {
        Ok(Frame::jpeg(offset_secs, vec![0xFF, 0xD8, 0xFF]))
    }
}

/// Sees a confident person in every frame.
struct PersonDetector;

#[async_trait]
impl Detector for PersonDetector {
    async fn detect(&self, _frame: &Frame) -> Result<Vec<Detection>, InferenceError> {
        Ok(vec![Detection::new("person", 0.9)])
    }
}

struct PersonLoader;

#[async_trait]
impl ModelLoader for PersonLoader {
    async fn load(&self) -> Result<Arc<dyn Detector>, InferenceError> {
        Ok(Arc::new(PersonDetector))
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Router plus the pieces tests inspect directly.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub storage_dir: tempfile::TempDir,
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(storage_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        storage_dir: storage_dir.to_path_buf(),
        public_base_url: "http://localhost:3000/files".to_string(),
        database_url: None,
    }
}

/// Build the full application router with all middleware layers over an
/// in-memory store, a fake decoder and a detector that flags every frame.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses.
pub fn build_test_app() -> TestApp {
    let storage_dir = tempfile::tempdir().unwrap();
    let config = test_config(storage_dir.path());

    let store = Arc::new(MemoryStore::new());
    let sampler = FrameSampler::new(Arc::new(FakeDecoder));
    let adapter = Arc::new(InferenceAdapter::new(
        Arc::new(PersonLoader),
        Duration::from_secs(1),
    ));
    let scheduler = ProcessingScheduler::new(
        sampler.clone(),
        adapter,
        Arc::clone(&store) as Arc<dyn AlertStore>,
        Arc::new(EventBus::default()),
        PipelineConfig::default(),
    );

    let state = AppState {
        store: Arc::clone(&store) as Arc<dyn AlertStore>,
        scheduler,
        storage: LocalVideoStorage::new(&config.storage_dir, &config.public_base_url),
        sampler,
        ws_manager: Arc::new(WsManager::new()),
        sync_config: SyncConfig::default(),
        config: Arc::new(config.clone()),
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    let router = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .nest_service("/files", ServeDir::new(&config.storage_dir))
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state);

    TestApp {
        router,
        store,
        storage_dir,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    json_request(app, Method::POST, uri, body).await
}

pub async fn put_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    json_request(app, Method::PUT, uri, body).await
}

async fn json_request(
    app: &Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// POST a multipart upload with a single file field.
pub async fn post_file(app: &Router, uri: &str, field: &str, name: &str, bytes: &[u8]) -> Response {
    const BOUNDARY: &str = "railwatch-test-boundary";

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: video/mp4\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
