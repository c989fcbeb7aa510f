//! HTTP-level integration tests for the experiment CRUD + lifecycle surface.
//!
//! Requires a running PostgreSQL database with this crate's migrations
//! applied to a throwaway database.
//! Run with: DATABASE_URL="postgres://..." cargo test -p control-plane --test experiments_http_test -- --ignored --nocapture

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use control_plane::services::PublishService;
use control_plane::{build_router, AppState};
use objectstore::{ObjectStoreClient, ObjectStoreConfig};
use publisher::Publisher;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn build_test_app(mock_server: &MockServer) -> axum::Router {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("failed to connect to test database");
    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    std::env::set_var("AWS_ACCESS_KEY_ID", "test");
    std::env::set_var("AWS_SECRET_ACCESS_KEY", "test");
    let objects = ObjectStoreClient::new(ObjectStoreConfig {
        bucket: "flag-configs".into(),
        region: "us-east-1".into(),
        endpoint: Some(mock_server.uri()),
        path_style: true,
    })
    .await;

    let publisher = Publisher::new(pool.clone(), objects);
    let publish = PublishService::new(pool.clone(), publisher);

    build_router(AppState { pool, publish })
}

async fn mount_publish_mocks(mock_server: &MockServer) {
    // version.json read (stale-write guard) before any publish has happened.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(mock_server)
        .await;
    // the three publish writes (numbered snapshot, latest.json, version.json).
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .mount(mock_server)
        .await;
}

async fn send_json(app: &axum::Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, parsed)
}

#[tokio::test]
#[ignore]
async fn experiment_lifecycle_creates_lists_and_transitions() {
    let mock_server = MockServer::start().await;
    mount_publish_mocks(&mock_server).await;
    let app = build_test_app(&mock_server).await;

    let (status, env) = send_json(&app, "POST", "/api/v1/environments", json!({"name": "prod-test"})).await;
    assert_eq!(status, StatusCode::OK);
    let environment_id = env["id"].as_str().unwrap();

    let (status, experiment) = send_json(
        &app,
        "POST",
        "/api/v1/experiments",
        json!({
            "environmentId": environment_id,
            "key": "checkout-button",
            "name": "Checkout button color",
            "salt": "checkout-salt",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(experiment["status"], "DRAFT");
    let experiment_id = experiment["id"].as_str().unwrap();

    let (status, list) = send_json(
        &app,
        "GET",
        &format!("/api/v1/experiments?environmentId={environment_id}&page=1&pageSize=20"),
        Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["pagination"]["total"], 1);

    let (status, experiment) = send_json(
        &app,
        "POST",
        &format!("/api/v1/experiments/{experiment_id}/status"),
        json!({"status": "RUNNING"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(experiment["status"], "RUNNING");

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/v1/experiments/{experiment_id}/status"),
        json!({"status": "DRAFT"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore]
async fn list_endpoint_rejects_partial_pagination_params() {
    let mock_server = MockServer::start().await;
    mount_publish_mocks(&mock_server).await;
    let app = build_test_app(&mock_server).await;

    let (status, _) = send_json(&app, "GET", "/api/v1/environments?page=2", Value::Null).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
