//! Shared helpers for relay-service integration tests.

#![allow(dead_code)]

use relay_service::config::{GeminiSettings, RelayConfig};
use relay_service::startup::Application;
use service_core::config::Config;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const TEST_API_KEY: &str = "test-api-key";
pub const TEST_MODEL: &str = "gemini-test";
pub const GENERATE_PATH: &str = "/models/gemini-test:generateContent";

/// Running application bound to a random local port.
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn post_chat(&self, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/chat", self.address))
            .json(&body)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .expect("Failed to send request")
    }
}

/// Gemini settings pointing at `api_base` (usually a wiremock server).
pub fn gemini_settings(api_base: &str, api_key: Option<&str>) -> GeminiSettings {
    GeminiSettings::new(api_key, TEST_MODEL).with_api_base(api_base)
}

/// Spawn the application with the real HTTP transport.
pub async fn spawn_app(gemini: GeminiSettings) -> TestApp {
    let config = RelayConfig {
        common: Config {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        gemini,
    };

    let app = Application::build(config)
        .await
        .expect("Failed to build application");
    let port = app.port();

    // Spawn the server in the background
    tokio::spawn(async move {
        let _ = app.run_until_stopped().await;
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

/// An address nothing is listening on.
pub fn closed_port_base() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let port = listener.local_addr().expect("No local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

/// Upstream that sends a status line and headers promising a 100 byte body,
/// writes only part of it, then stalls. Returns its base URL and a counter
/// of accepted connections.
pub async fn spawn_stalling_upstream(status: u16) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let base = format!("http://{}", listener.local_addr().expect("No local addr"));
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut request = vec![0u8; 16 * 1024];
                let _ = stream.read(&mut request).await;
                let head = format!(
                    "HTTP/1.1 {} Status\r\nContent-Type: text/plain\r\nContent-Length: 100\r\n\r\nserver busy",
                    status
                );
                let _ = stream.write_all(head.as_bytes()).await;
                tokio::time::sleep(Duration::from_secs(10)).await;
            });
        }
    });

    (base, connections)
}

pub fn candidate_json(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [
            {"content": {"role": "model", "parts": [{"text": text}]}, "finishReason": "STOP"}
        ],
        "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5}
    })
}
