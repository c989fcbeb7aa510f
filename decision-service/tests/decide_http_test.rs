//! Drives the `/decide` and `/health` HTTP surface end to end, in-process,
//! against a `wiremock` stand-in for the object store, building a real
//! `Router` and driving it with `tower::ServiceExt::oneshot` instead of
//! binding a socket.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use decision_service::config_store::ConfigStore;
use decision_service::{build_router, AppState};
use flagcore::{ConfigExperiment, ConfigSnapshot, SnapshotAllocation, SnapshotVariant};
use objectstore::{ObjectStoreClient, ObjectStoreConfig};
use serde_json::Value;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn snapshot() -> ConfigSnapshot {
    ConfigSnapshot {
        version: 4,
        environment: "prod".into(),
        published_at: Utc::now(),
        experiments: vec![ConfigExperiment {
            id: "exp-1".into(),
            key: "checkout-button".into(),
            salt: "checkout-salt".into(),
            audience_rules: vec![],
            targeting_rules: vec![],
            variants: vec![SnapshotVariant {
                id: "v-1".into(),
                key: "control".into(),
                payload: None,
            }],
            allocations: vec![SnapshotAllocation {
                variant_id: "v-1".into(),
                range_start: 0,
                range_end: 9999,
            }],
        }],
    }
}

async fn test_object_store(mock_server: &MockServer) -> ObjectStoreClient {
    std::env::set_var("AWS_ACCESS_KEY_ID", "test");
    std::env::set_var("AWS_SECRET_ACCESS_KEY", "test");

    ObjectStoreClient::new(ObjectStoreConfig {
        bucket: "flag-configs".into(),
        region: "us-east-1".into(),
        endpoint: Some(mock_server.uri()),
        path_style: true,
    })
    .await
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn decide_returns_assignment_for_registered_environment() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flag-configs/configs/prod/snapshots/latest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot()))
        .mount(&mock_server)
        .await;

    let objects = test_object_store(&mock_server).await;
    let store = ConfigStore::new(objects);
    store.load("prod").await.unwrap();

    let app = build_router(AppState { store });
    let response = app
        .oneshot(
            Request::builder()
                .uri("/decide?user_key=user-1&env=prod")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["environment"], "prod");
    assert_eq!(body["config_version"], 4);
    assert_eq!(body["assignments"][0]["variantKey"], "control");
}

#[tokio::test]
async fn decide_lazily_registers_unseen_environment() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flag-configs/configs/staging/snapshots/latest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ConfigSnapshot {
            environment: "staging".into(),
            ..snapshot()
        }))
        .mount(&mock_server)
        .await;

    let objects = test_object_store(&mock_server).await;
    let store = ConfigStore::new(objects);
    let app = build_router(AppState { store });

    let response = app
        .oneshot(
            Request::builder()
                .uri("/decide?user_key=user-1&env=staging")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn decide_returns_503_for_environment_with_no_snapshot() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flag-configs/configs/missing/snapshots/latest.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let objects = test_object_store(&mock_server).await;
    let store = ConfigStore::new(objects);
    let app = build_router(AppState { store });

    let response = app
        .oneshot(
            Request::builder()
                .uri("/decide?user_key=user-1&env=missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn decide_returns_400_when_user_key_missing() {
    let mock_server = MockServer::start().await;
    let objects = test_object_store(&mock_server).await;
    let store = ConfigStore::new(objects);
    let app = build_router(AppState { store });

    let response = app
        .oneshot(
            Request::builder()
                .uri("/decide?env=prod")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_installed_versions() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flag-configs/configs/prod/snapshots/latest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot()))
        .mount(&mock_server)
        .await;

    let objects = test_object_store(&mock_server).await;
    let store = ConfigStore::new(objects);
    store.load("prod").await.unwrap();

    let app = build_router(AppState { store });
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["config_versions"]["prod"], 4);
}
