mod common;

use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use common::{body_json, build_test_app, get, post_file, post_json, CORRUPT_VIDEO};
use railwatch_core::records::Collection;
use railwatch_store::AlertStore;

const WAIT: Duration = Duration::from_secs(5);

/// Poll a job until it leaves `running`.
async fn wait_for_job(app: &Router, id: &str) -> serde_json::Value {
    let uri = format!("/api/v1/jobs/{id}");
    tokio::time::timeout(WAIT, async {
        loop {
            let job = body_json(get(app, &uri).await).await;
            if job["data"]["state"] != "running" {
                return job["data"].clone();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("job did not finish in time")
}

#[tokio::test]
async fn upload_starts_a_job_that_raises_alerts() {
    let app = build_test_app();

    let response = post_file(&app.router, "/api/v1/videos", "video", "ride 7.mp4", b"mp4 bytes").await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let started = body_json(response).await;
    let id = started["data"]["id"].as_str().unwrap().to_string();
    let locator = started["data"]["video"].as_str().unwrap().to_string();
    assert_eq!(started["data"]["total_frames"], 3);
    assert!(locator.starts_with("http://localhost:3000/files/videos/"));
    assert!(locator.ends_with("_ride_7.mp4"));

    let finished = wait_for_job(&app.router, &id).await;
    assert_eq!(finished["state"], "completed");
    assert_eq!(finished["frames_processed"], 3);
    assert_eq!(finished["alerts_emitted"], 3);
    assert_eq!(finished["progress"], 1.0);

    let alerts = body_json(get(&app.router, "/api/v1/alerts").await).await;
    let alerts = alerts["data"].as_array().unwrap();
    assert_eq!(alerts.len(), 3);
    for alert in alerts {
        assert_eq!(alert["type"], "Fall Detected");
        assert_eq!(alert["location"], "Video Analysis");
        assert_eq!(alert["videoUrl"], locator.as_str());
    }
    // Newest first.
    assert!(alerts[0]["key"].as_str().unwrap() > alerts[2]["key"].as_str().unwrap());

    let jobs = body_json(get(&app.router, "/api/v1/jobs").await).await;
    assert_eq!(jobs["data"][0]["id"], id.as_str());
}

#[tokio::test]
async fn uploaded_file_is_served_under_files() {
    let app = build_test_app();

    let started = body_json(
        post_file(&app.router, "/api/v1/videos", "video", "clip.mp4", b"mp4 bytes").await,
    )
    .await;
    let locator = started["data"]["video"].as_str().unwrap();
    let path = locator.trim_start_matches("http://localhost:3000");

    let response = get(&app.router, path).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unreadable_video_is_rejected_without_a_job() {
    let app = build_test_app();

    let response = post_file(&app.router, "/api/v1/videos", "video", "bad.mp4", CORRUPT_VIDEO).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "UNREADABLE_VIDEO");
    let jobs = body_json(get(&app.router, "/api/v1/jobs").await).await;
    assert!(jobs["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unreadable_upload_leaves_no_file_behind() {
    let app = build_test_app();

    let response = post_file(&app.router, "/api/v1/videos", "video", "bad.mp4", CORRUPT_VIDEO).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let videos = app.storage_dir.path().join("videos");
    let leftover = std::fs::read_dir(&videos)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftover, 0);
}

#[tokio::test]
async fn upload_without_video_field_is_bad_request() {
    let app = build_test_app();

    let response = post_file(&app.router, "/api/v1/videos", "attachment", "a.mp4", b"x").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn empty_upload_is_rejected() {
    let app = build_test_app();

    let response = post_file(&app.router, "/api/v1/videos", "video", "a.mp4", b"").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let app = build_test_app();
    let id = uuid::Uuid::now_v7();

    let response = get(&app.router, &format!("/api/v1/jobs/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_json(
        &app.router,
        &format!("/api/v1/jobs/{id}/cancel"),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancelling_a_finished_job_is_a_no_op() {
    let app = build_test_app();
    let started = body_json(
        post_file(&app.router, "/api/v1/videos", "video", "clip.mp4", b"mp4 bytes").await,
    )
    .await;
    let id = started["data"]["id"].as_str().unwrap().to_string();
    wait_for_job(&app.router, &id).await;

    let response = post_json(
        &app.router,
        &format!("/api/v1/jobs/{id}/cancel"),
        serde_json::json!({}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["state"], "completed");
}

#[tokio::test]
async fn alerts_are_empty_initially() {
    let app = build_test_app();
    let alerts = body_json(get(&app.router, "/api/v1/alerts").await).await;
    assert!(alerts["data"].as_array().unwrap().is_empty());

    let snapshot = app.store.snapshot(Collection::Alerts).await.unwrap();
    assert!(snapshot.is_empty());
}
