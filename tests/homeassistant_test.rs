//! Home Assistant REST calls against a mock server.

use std::sync::Arc;

use camstream::config::{Config, NotifierConfig};
use camstream::notifications::{HaAuth, HomeAssistantClient, LifecycleNotifier, StreamNotifier};
use camstream_common::{CodecStrategy, EntityState, Error, StopReason};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_client(server: &MockServer) -> HomeAssistantClient {
    let config = NotifierConfig {
        base_url: Some(format!("{}/api", server.uri())),
        token: Some("long-lived".to_string()),
        ..Default::default()
    };
    HomeAssistantClient::new(HaAuth::resolve(None, &config))
}

#[tokio::test]
async fn fire_event_posts_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/events/camstream_started"))
        .and(header("authorization", "Bearer long-lived"))
        .and(body_partial_json(json!({ "camera": "Front Door" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = user_client(&server);
    assert!(client.is_enabled());
    client
        .fire_event("camstream_started", json!({ "camera": "Front Door" }))
        .await
        .unwrap();
}

#[tokio::test]
async fn set_state_posts_state_and_attributes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/states/binary_sensor.camstream_playing"))
        .and(body_partial_json(json!({
            "state": "on",
            "attributes": { "device_class": "running" }
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    user_client(&server)
        .set_state(
            "binary_sensor.camstream_playing",
            EntityState::On,
            json!({ "device_class": "running" }),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn http_error_is_notifier_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = user_client(&server)
        .fire_event("camstream_stopped", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Notifier(_)));
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn malformed_entity_id_rejected_before_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = user_client(&server)
        .set_state("camstream playing", EntityState::Off, json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Notifier(_)));
}

#[tokio::test]
async fn ping_returns_top_level_keys() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "API running." })))
        .mount(&server)
        .await;

    let keys = user_client(&server).ping().await.unwrap();
    assert_eq!(keys, vec!["message".to_string()]);
}

#[tokio::test]
async fn stream_notifier_survives_unreachable_api() {
    let server = MockServer::start().await;
    let client = user_client(&server);
    // Nothing listens here once the server is gone.
    drop(server);

    let notifier = StreamNotifier::new(Arc::new(client), &Config::default());
    notifier
        .signal_playing("Front Door", CodecStrategy::Copy)
        .await;
    notifier
        .signal_stopped("Front Door", StopReason::Fatal)
        .await;
}

#[tokio::test]
async fn stream_notifier_sends_event_and_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/events/front_stopped"))
        .and(body_partial_json(json!({ "camera": "Front Door", "reason": "shutdown" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/states/binary_sensor.front_live"))
        .and(body_partial_json(json!({
            "state": "off",
            "attributes": { "reason": "shutdown", "friendly_name": "Camera Livestream Playing" }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.notifier.event_prefix = "front".to_string();
    config.notifier.entity_id = "binary_sensor.front_live".to_string();

    StreamNotifier::new(Arc::new(user_client(&server)), &config)
        .signal_stopped("Front Door", StopReason::Shutdown)
        .await;
}
