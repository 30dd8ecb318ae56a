use std::time::Duration;

use agora_client::{HEADER_API_KEY, HEADER_REQUEST_ID, HttpPreferencePersistence};
use agora_prefs::{PersistenceError, PreferencePersistence};
use agora_test_support::fixtures::{customized_snapshot, english_defaults};
use httpmock::Method::PUT;
use httpmock::prelude::*;
use serde_json::json;

fn backend_for(server: &MockServer, api_key: Option<&str>) -> HttpPreferencePersistence {
    let base = server.base_url().parse().expect("valid URL");
    HttpPreferencePersistence::new(&base, api_key.map(str::to_string), Duration::from_secs(5))
        .expect("backend builds")
}

#[tokio::test]
async fn store_puts_snapshot_with_headers() {
    let server = MockServer::start_async().await;
    let snapshot = customized_snapshot();
    let body = serde_json::to_value(&snapshot).expect("snapshot serializes");
    let mock = server.mock(move |when, then| {
        when.method(PUT)
            .path("/v1/preferences")
            .header(HEADER_API_KEY, "secret")
            .header_exists(HEADER_REQUEST_ID)
            .json_body(body);
        then.status(204);
    });

    backend_for(&server, Some("secret"))
        .store(&snapshot)
        .await
        .expect("store should succeed");
    mock.assert();
}

#[tokio::test]
async fn load_returns_none_on_not_found() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/v1/preferences");
        then.status(404);
    });

    let loaded = backend_for(&server, None).load().await.expect("load ok");
    assert_eq!(loaded, None);
}

#[tokio::test]
async fn load_decodes_stored_snapshot() {
    let server = MockServer::start_async().await;
    let snapshot = english_defaults();
    let body = serde_json::to_value(&snapshot).expect("snapshot serializes");
    server.mock(move |when, then| {
        when.method(GET).path("/v1/preferences");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(body);
    });

    let loaded = backend_for(&server, None).load().await.expect("load ok");
    assert_eq!(loaded, Some(snapshot));
}

#[tokio::test]
async fn load_reports_corrupt_payload() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/v1/preferences");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"notifications": []}));
    });

    let err = backend_for(&server, None)
        .load()
        .await
        .expect_err("corrupt payload");
    assert!(matches!(err, PersistenceError::Corrupt { .. }));
}

#[tokio::test]
async fn store_maps_problem_details_to_validation() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(PUT).path("/v1/preferences");
        then.status(422)
            .header("content-type", "application/problem+json")
            .json_body(json!({
                "type": "about:blank",
                "title": "invalid preferences",
                "status": 422,
                "detail": "quiet hours end is out of range"
            }));
    });

    let err = backend_for(&server, None)
        .store(&english_defaults())
        .await
        .expect_err("validation failure");
    assert_eq!(
        err,
        PersistenceError::Validation {
            detail: "quiet hours end is out of range".into()
        }
    );
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn store_falls_back_to_body_text_on_bad_request() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(PUT).path("/v1/preferences");
        then.status(400).body("locale not supported");
    });

    let err = backend_for(&server, None)
        .store(&english_defaults())
        .await
        .expect_err("validation failure");
    assert_eq!(
        err,
        PersistenceError::Validation {
            detail: "locale not supported".into()
        }
    );
}

#[tokio::test]
async fn store_maps_auth_and_server_statuses() {
    let forbidden = MockServer::start_async().await;
    forbidden.mock(|when, then| {
        when.method(PUT).path("/v1/preferences");
        then.status(403);
    });
    assert_eq!(
        backend_for(&forbidden, Some("stale"))
            .store(&english_defaults())
            .await,
        Err(PersistenceError::Unauthorized)
    );

    let unavailable = MockServer::start_async().await;
    unavailable.mock(|when, then| {
        when.method(PUT).path("/v1/preferences");
        then.status(503);
    });
    let err = backend_for(&unavailable, None)
        .store(&english_defaults())
        .await
        .expect_err("server failure");
    assert_eq!(err, PersistenceError::Server { status: 503 });
    assert!(err.is_retryable());
}

#[tokio::test]
async fn slow_server_maps_to_timeout() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(PUT).path("/v1/preferences");
        then.status(204).delay(Duration::from_secs(2));
    });

    let base = server.base_url().parse().expect("valid URL");
    let backend = HttpPreferencePersistence::new(&base, None, Duration::from_millis(100))
        .expect("backend builds");
    assert_eq!(
        backend.store(&english_defaults()).await,
        Err(PersistenceError::Timeout)
    );
}

#[tokio::test]
async fn unreachable_server_maps_to_network() {
    let base = "http://127.0.0.1:9/".parse().expect("valid URL");
    let backend = HttpPreferencePersistence::new(&base, None, Duration::from_secs(2))
        .expect("backend builds");
    let err = backend
        .store(&english_defaults())
        .await
        .expect_err("connection refused");
    assert!(matches!(
        err,
        PersistenceError::Network { .. } | PersistenceError::Timeout
    ));
}

#[tokio::test]
async fn base_url_path_prefix_is_kept() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET).path("/api/v1/preferences");
        then.status(404);
    });

    let base = server.url("/api").parse().expect("valid URL");
    let backend = HttpPreferencePersistence::new(&base, None, Duration::from_secs(5))
        .expect("backend builds");
    assert_eq!(backend.endpoint().path(), "/api/v1/preferences");
    assert_eq!(backend.load().await.expect("load ok"), None);
    mock.assert();
}
