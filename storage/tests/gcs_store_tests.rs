//! Integration tests for GcsStore.
//!
//! Uses wiremock to stand in for the GCS JSON API: build listing with
//! pagination, artifact listing relative to the build, media reads and status
//! mapping.

use perfdash_core::{ArtifactStore, StoreError};
use perfdash_storage::{GcsConfig, GcsStore};
use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OBJECTS: &str = "/storage/v1/b/bucket/o";

fn create_test_store(mock_server: &MockServer) -> GcsStore {
    GcsStore::new(GcsConfig {
        bucket: "bucket".to_string(),
        logs_path: "logs".to_string(),
        endpoint: mock_server.uri(),
        timeout_secs: 5,
    })
    .expect("failed to create store")
}

#[tokio::test]
async fn test_list_builds_follows_pages() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(OBJECTS))
        .and(query_param("prefix", "logs/ci-job/"))
        .and(query_param("delimiter", "/"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "prefixes": ["logs/ci-job/9/", "logs/ci-job/10/"],
            "items": [{"name": "logs/ci-job/latest-build.txt"}],
            "nextPageToken": "p2"
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(OBJECTS))
        .and(query_param("pageToken", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "prefixes": ["logs/ci-job/11/", "logs/ci-job/latest/"]
        })))
        .mount(&mock_server)
        .await;

    let store = create_test_store(&mock_server);
    let builds = store.list_builds("ci-job").await.expect("listing failed");
    assert_eq!(builds, vec![11, 10, 9]);
}

#[tokio::test]
async fn test_list_builds_unknown_job() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(OBJECTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"kind": "storage#objects"})))
        .mount(&mock_server)
        .await;

    let store = create_test_store(&mock_server);
    assert!(matches!(
        store.list_builds("ghost").await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_list_artifacts_relative_to_build() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(OBJECTS))
        .and(query_param("prefix", "logs/ci-job/5/artifacts/E2E"))
        .and(query_param_is_missing("delimiter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"name": "logs/ci-job/5/artifacts/E2E_Latency_2.json"},
                {"name": "logs/ci-job/5/artifacts/E2E_Latency_1.json"}
            ]
        })))
        .mount(&mock_server)
        .await;

    let store = create_test_store(&mock_server);
    let artifacts = store
        .list_artifacts("ci-job", 5, "artifacts/E2E")
        .await
        .expect("listing failed");
    assert_eq!(
        artifacts,
        vec!["artifacts/E2E_Latency_1.json", "artifacts/E2E_Latency_2.json"]
    );
}

#[tokio::test]
async fn test_read_artifact_media() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(
            "/storage/v1/b/bucket/o/logs%2Fci-job%2F5%2Fartifacts%2FE2E_Latency_1.json",
        ))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"builds": []}"#))
        .mount(&mock_server)
        .await;

    let store = create_test_store(&mock_server);
    let content = store
        .read_artifact("ci-job", 5, "artifacts/E2E_Latency_1.json")
        .await
        .expect("read failed");
    assert_eq!(content, br#"{"builds": []}"#.to_vec());
}

#[tokio::test]
async fn test_read_artifact_status_mapping() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/storage/v1/b/bucket/o/logs%2Fci-job%2F5%2Fmissing.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/storage/v1/b/bucket/o/logs%2Fci-job%2F5%2Fbroken.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let store = create_test_store(&mock_server);
    assert!(matches!(
        store.read_artifact("ci-job", 5, "missing.json").await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        store.read_artifact("ci-job", 5, "broken.json").await,
        Err(StoreError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_listing_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(OBJECTS))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let store = create_test_store(&mock_server);
    assert!(matches!(
        store.list_builds("ci-job").await,
        Err(StoreError::InvalidResponse(_))
    ));
}
