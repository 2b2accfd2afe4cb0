mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get};

#[tokio::test]
async fn health_reports_ok_with_memory_store() {
    let app = build_test_app();

    let response = get(&app.router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["store"], "memory");
    assert_eq!(json["running_jobs"], 0);
    assert_eq!(json["ws_connections"], 0);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn health_is_not_under_api_prefix() {
    let app = build_test_app();
    let response = get(&app.router, "/api/v1/health").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = build_test_app();
    let response = get(&app.router, "/health").await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn cors_preflight_allows_dashboard_origin() {
    use axum::body::Body;
    use axum::http::{Method, Request};

    let app = build_test_app();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/reports")
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "PUT")
        .body(Body::empty())
        .unwrap();

    let response = common::send(&app.router, request).await;
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:5173"
    );
}
