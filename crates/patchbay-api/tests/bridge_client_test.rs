#![allow(clippy::unwrap_used)]
// Integration tests for `BridgeClient` using wiremock.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use patchbay_api::{BridgeClient, Error, TransportConfig, WireConnection};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, BridgeClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client =
        BridgeClient::with_client(reqwest::Client::new(), base_url, Duration::from_secs(5));
    (server, client)
}

fn conn(from: &str, to: &str) -> WireConnection {
    WireConnection {
        from: from.into(),
        to: to.into(),
    }
}

// ── Health & status ─────────────────────────────────────────────────

#[tokio::test]
async fn test_health_healthy() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "jack_running": true,
            "service": "jack-bridge",
            "version": "1.0.0"
        })))
        .mount(&server)
        .await;

    let health = client.health().await.unwrap();
    assert!(health.is_running());
    assert_eq!(health.service.as_deref(), Some("jack-bridge"));
}

#[tokio::test]
async fn test_health_unhealthy_503_still_decodes() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "status": "unhealthy",
            "jack_running": false
        })))
        .mount(&server)
        .await;

    let health = client.health().await.unwrap();
    assert!(!health.is_running());
}

#[tokio::test]
async fn test_status_jack_down_is_not_an_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "JACK not running"
        })))
        .mount(&server)
        .await;

    let status = client.status().await.unwrap();
    assert!(!status.running);
    assert_eq!(status.sample_rate, None);
}

#[tokio::test]
async fn test_status_running() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "jack_running": true,
            "sample_rate": 48000,
            "buffer_size": 256
        })))
        .mount(&server)
        .await;

    let status = client.status().await.unwrap();
    assert!(status.running);
    assert_eq!(status.sample_rate, Some(48000));
    assert_eq!(status.buffer_size, Some(256));
}

// ── Listing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_ports_json() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/ports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "ports": ["system:capture_1", "system:playback_1"]
        })))
        .mount(&server)
        .await;

    let ports = client.list_ports().await.unwrap();
    let names: Vec<_> = ports.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["system:capture_1", "system:playback_1"]);
}

#[tokio::test]
async fn test_list_ports_reported_failure() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/ports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "JACK not running"
        })))
        .mount(&server)
        .await;

    let result = client.list_ports().await;
    assert!(
        matches!(result, Err(Error::Bridge { ref message }) if message == "JACK not running"),
        "expected Bridge error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_list_connections_json() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/connections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "connections": [
                {"from": "system:capture_1", "to": "system:playback_1"},
                {"from": "system:capture_2", "to": "system:playback_2"}
            ]
        })))
        .mount(&server)
        .await;

    let connections = client.list_connections().await.unwrap();
    assert_eq!(
        connections,
        vec![
            conn("system:capture_1", "system:playback_1"),
            conn("system:capture_2", "system:playback_2"),
        ]
    );
}

#[tokio::test]
async fn test_list_connections_lsp_text() {
    let (server, client) = setup().await;

    let text = "system:capture_1\n   system:playback_1\nsystem:playback_1\n   system:capture_1\n";
    Mock::given(method("GET"))
        .and(path("/connections"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(text, "text/plain"))
        .mount(&server)
        .await;

    let connections = client.list_connections().await.unwrap();
    assert_eq!(connections, vec![conn("system:capture_1", "system:playback_1")]);
}

#[tokio::test]
async fn test_malformed_json_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/connections"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{not json", "application/json"))
        .mount(&server)
        .await;

    let result = client.list_connections().await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

// ── Mutations ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_sends_source_and_destination() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/connect"))
        .and(body_json(json!({
            "source": "system:capture_1",
            "destination": "system:playback_1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "already_connected": true,
            "message": "Ports already connected"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client
        .connect("system:capture_1", "system:playback_1")
        .await
        .unwrap();
    assert!(resp.already_connected);
}

#[tokio::test]
async fn test_connect_failure() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "Connection failed"
        })))
        .mount(&server)
        .await;

    let result = client.connect("a:out", "b:in").await;
    assert!(
        matches!(result, Err(Error::Bridge { ref message }) if message == "Connection failed"),
        "expected Bridge error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_disconnect_unknown_route_is_unsupported() {
    let (server, client) = setup().await;

    // The daemon answers unknown routes with HTTP 200 and this body.
    Mock::given(method("POST"))
        .and(path("/disconnect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "Not found",
            "path": "/disconnect"
        })))
        .mount(&server)
        .await;

    let err = client.disconnect("a:out", "b:in").await.unwrap_err();
    assert!(err.is_unsupported(), "got {err:?}");
}

#[tokio::test]
async fn test_disconnect_http_404_is_unsupported() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/disconnect"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.disconnect("a:out", "b:in").await.unwrap_err();
    assert!(err.is_unsupported(), "got {err:?}");
}

#[tokio::test]
async fn test_disconnect_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/disconnect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    client.disconnect("a:out", "b:in").await.unwrap();
}

#[tokio::test]
async fn test_clear_returns_count() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/clear"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "count": 3
        })))
        .mount(&server)
        .await;

    assert_eq!(client.clear().await.unwrap(), 3);
}

#[tokio::test]
async fn test_clear_unsupported_flag() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/clear"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unsupported": true })))
        .mount(&server)
        .await;

    let err = client.clear().await.unwrap_err();
    assert!(err.is_unsupported(), "got {err:?}");
}

// ── Transport ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_timeout_maps_to_timeout_error() {
    let server = MockServer::start().await;
    let transport = TransportConfig {
        timeout: Duration::from_millis(100),
        connect_timeout: Duration::from_millis(100),
    };
    let client = BridgeClient::new(Url::parse(&server.uri()).unwrap(), &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "healthy" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = client.health().await.unwrap_err();
    assert!(
        matches!(err, Error::Timeout { timeout_ms: 100 }),
        "expected Timeout, got: {err:?}"
    );
    assert!(err.is_unreachable());
}

#[tokio::test]
async fn test_prebuilt_client_reports_its_timeout() {
    let server = MockServer::start().await;
    let timeout = Duration::from_millis(150);
    let http = reqwest::Client::builder().timeout(timeout).build().unwrap();
    let client = BridgeClient::with_client(http, Url::parse(&server.uri()).unwrap(), timeout);

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "healthy" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = client.health().await.unwrap_err();
    assert!(
        matches!(err, Error::Timeout { timeout_ms: 150 }),
        "expected Timeout, got: {err:?}"
    );
    assert!(err.to_string().contains("150ms"));
}

#[tokio::test]
async fn test_base_path_prefix_is_preserved() {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/jack", server.uri())).unwrap();
    let client =
        BridgeClient::with_client(reqwest::Client::new(), base_url, Duration::from_secs(5));

    Mock::given(method("GET"))
        .and(path("/jack/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "running": true })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.health().await.unwrap().running);
}
