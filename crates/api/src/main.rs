use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use railwatch_api::config::ServerConfig;
use railwatch_api::notifications::NotificationRouter;
use railwatch_api::{routes, state, ws};
use railwatch_core::sampler::FrameSampler;
use railwatch_core::storage::LocalVideoStorage;
use railwatch_events::EventBus;
use railwatch_inference::{HttpModelLoader, InferenceAdapter, InferenceConfig};
use railwatch_pipeline::{PipelineConfig, ProcessingScheduler};
use railwatch_store::{AlertStore, MemoryStore, PgStore};
use railwatch_sync::SyncConfig;

use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "railwatch_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let pipeline_config = PipelineConfig::from_env();
    let inference_config = InferenceConfig::from_env();
    let sync_config = SyncConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    tracing::info!(
        frame_interval_secs = pipeline_config.frame_interval_secs,
        fall_threshold = pipeline_config.fall_threshold,
        inference_url = %inference_config.base_url,
        model = %inference_config.model,
        "Loaded pipeline configuration",
    );

    // --- Alert store ---
    let mut pg_store: Option<Arc<PgStore>> = None;
    let store: Arc<dyn AlertStore> = match &config.database_url {
        Some(database_url) => {
            let pool = railwatch_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            railwatch_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            railwatch_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            let pg = Arc::new(
                PgStore::connect(pool)
                    .await
                    .expect("Failed to load alert store"),
            );
            pg_store = Some(Arc::clone(&pg));
            pg
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory alert store");
            Arc::new(MemoryStore::new())
        }
    };

    // --- CORS ---
    let cors = build_cors_layer(&config);

    // --- WebSocket manager ---
    let ws_manager = Arc::new(ws::WsManager::new());

    // --- Heartbeat ---
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_manager));

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let notification_router = NotificationRouter::new(Arc::clone(&ws_manager));
    let router_handle = tokio::spawn(notification_router.run(event_bus.subscribe()));
    tracing::info!("Event bus and notification router started");

    // --- Pipeline ---
    let sampler = FrameSampler::ffmpeg();
    let adapter = Arc::new(InferenceAdapter::new(
        Arc::new(HttpModelLoader::new(&inference_config)),
        inference_config.timeout,
    ));
    let scheduler = ProcessingScheduler::new(
        sampler.clone(),
        adapter,
        Arc::clone(&store),
        Arc::clone(&event_bus),
        pipeline_config,
    );
    let storage = LocalVideoStorage::new(&config.storage_dir, &config.public_base_url);

    // --- App state ---
    let state = AppState {
        store,
        scheduler: scheduler.clone(),
        storage,
        sampler,
        ws_manager: Arc::clone(&ws_manager),
        sync_config,
        config: Arc::new(config.clone()),
    };

    // --- Request ID header name ---
    let request_id_header = HeaderName::from_static("x-request-id");

    // --- Router ---
    let app = Router::new()
        // Health check at root level (not under /api/v1).
        .merge(routes::health::router())
        // API v1 routes.
        .nest("/api/v1", routes::api_routes())
        // Stored uploads, addressed by the locators handed out on upload.
        .nest_service("/files", ServeDir::new(&config.storage_dir))
        // -- Middleware stack (applied bottom-up) --
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
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

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Running jobs stop at their next frame boundary.
    scheduler.shutdown();

    if let Some(pg) = pg_store {
        pg.shutdown();
        tracing::info!("Alert store listener stopped");
    }

    // Drop the scheduler and the last bus handle to close the broadcast
    // channel, which ends the notification router.
    drop(scheduler);
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), router_handle).await;
    tracing::info!("Notification router shut down");

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    heartbeat_handle.abort();
    tracing::info!("Heartbeat task stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Build the CORS middleware layer from server configuration.
///
/// Panics at startup if any configured origin is invalid.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
