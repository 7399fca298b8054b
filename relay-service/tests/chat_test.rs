//! End-to-end tests for `POST /chat` against a mocked Gemini API.
//! Run with: cargo test -p relay-service --test chat_test

mod common;

use common::{
    candidate_json, closed_port_base, gemini_settings, spawn_app, spawn_stalling_upstream,
    GENERATE_PATH, TEST_API_KEY,
};
use std::sync::atomic::Ordering;
use relay_service::services::relay::compose_prompt;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn detail_of(response: reqwest::Response) -> String {
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    body["detail"]
        .as_str()
        .expect("detail must be a string")
        .to_string()
}

#[tokio::test]
async fn relays_message_and_returns_reply() {
    let upstream = MockServer::start().await;
    let expected_payload = json!({
        "contents": [
            {"role": "user", "parts": [{"text": compose_prompt("Nerede kahvaltı yapabilirim?")}]}
        ]
    });

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(query_param("key", TEST_API_KEY))
        .and(body_json(&expected_payload))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate_json(
            "Karaköy'de güzel bir kahvaltı yeri var.",
        )))
        .expect(1)
        .mount(&upstream)
        .await;

    let app = spawn_app(gemini_settings(&upstream.uri(), Some(TEST_API_KEY))).await;

    let response = app
        .post_chat(json!({"message": "  Nerede kahvaltı yapabilirim?  "}))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body, json!({"reply": "Karaköy'de güzel bir kahvaltı yeri var."}));
}

#[tokio::test]
async fn blank_message_is_rejected_before_upstream() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate_json("unused")))
        .expect(0)
        .mount(&upstream)
        .await;

    let app = spawn_app(gemini_settings(&upstream.uri(), Some(TEST_API_KEY))).await;

    for body in [json!({"message": "   "}), json!({"message": ""}), json!({})] {
        let response = app.post_chat(body).await;
        assert_eq!(response.status().as_u16(), 400);
        assert_eq!(detail_of(response).await, "message must not be empty");
    }
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let upstream = MockServer::start().await;
    let app = spawn_app(gemini_settings(&upstream.uri(), Some(TEST_API_KEY))).await;

    let response = app
        .client
        .post(format!("{}/chat", app.address))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 400);
    assert!(!detail_of(response).await.is_empty());
}

#[tokio::test]
async fn missing_api_key_is_a_server_error() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate_json("unused")))
        .expect(0)
        .mount(&upstream)
        .await;

    let app = spawn_app(gemini_settings(&upstream.uri(), None)).await;

    let response = app.post_chat(json!({"message": "merhaba"})).await;

    assert_eq!(response.status().as_u16(), 500);
    assert_eq!(
        detail_of(response).await,
        "GEMINI_API_KEY missing (env var)"
    );
}

#[tokio::test]
async fn upstream_error_status_maps_to_bad_gateway_without_retry() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("server busy"))
        .expect(1)
        .mount(&upstream)
        .await;

    let app = spawn_app(gemini_settings(&upstream.uri(), Some(TEST_API_KEY))).await;

    let response = app.post_chat(json!({"message": "merhaba"})).await;

    assert_eq!(response.status().as_u16(), 502);
    let detail = detail_of(response).await;
    assert!(detail.contains("503"), "detail: {detail}");
    assert!(detail.contains("server busy"), "detail: {detail}");
}

#[tokio::test]
async fn unexpected_success_shape_is_a_parse_error() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&upstream)
        .await;

    let app = spawn_app(gemini_settings(&upstream.uri(), Some(TEST_API_KEY))).await;

    let response = app.post_chat(json!({"message": "merhaba"})).await;

    assert_eq!(response.status().as_u16(), 500);
    assert!(detail_of(response).await.starts_with("Parse error."));
}

#[tokio::test]
async fn unreachable_upstream_maps_to_gateway_timeout() {
    let app = spawn_app(gemini_settings(&closed_port_base(), Some(TEST_API_KEY))).await;

    let response = app.post_chat(json!({"message": "merhaba"})).await;

    assert_eq!(response.status().as_u16(), 504);
    let detail = detail_of(response).await;
    assert!(detail.starts_with("Gemini unreachable:"), "detail: {detail}");
    assert!(!detail.contains(TEST_API_KEY), "detail leaks key: {detail}");
}

#[tokio::test]
async fn slow_upstream_is_retried_once_then_times_out() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(candidate_json("too late"))
                .set_delay(Duration::from_secs(3)),
        )
        .expect(2)
        .mount(&upstream)
        .await;

    let mut settings = gemini_settings(&upstream.uri(), Some(TEST_API_KEY));
    settings.read_timeout = Duration::from_millis(200);
    let app = spawn_app(settings).await;

    let response = app.post_chat(json!({"message": "merhaba"})).await;

    assert_eq!(response.status().as_u16(), 504);
}

#[tokio::test]
async fn truncated_error_body_maps_to_bad_gateway_without_retry() {
    let (base, connections) = spawn_stalling_upstream(503).await;

    let mut settings = gemini_settings(&base, Some(TEST_API_KEY));
    settings.read_timeout = Duration::from_millis(300);
    let app = spawn_app(settings).await;

    let response = app.post_chat(json!({"message": "merhaba"})).await;

    assert_eq!(response.status().as_u16(), 502);
    let detail = detail_of(response).await;
    assert!(detail.contains("503"), "detail: {detail}");
    assert!(detail.contains("body unreadable"), "detail: {detail}");
    assert_eq!(connections.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn truncated_success_body_is_a_parse_error_without_retry() {
    let (base, connections) = spawn_stalling_upstream(200).await;

    let mut settings = gemini_settings(&base, Some(TEST_API_KEY));
    settings.read_timeout = Duration::from_millis(300);
    let app = spawn_app(settings).await;

    let response = app.post_chat(json!({"message": "merhaba"})).await;

    assert_eq!(response.status().as_u16(), 500);
    assert!(detail_of(response).await.starts_with("Parse error."));
    assert_eq!(connections.load(Ordering::SeqCst), 1);
}
