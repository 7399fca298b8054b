//! Gemini `generateContent` transport and wire types.

use super::{TransportError, UpstreamReply, UpstreamTransport};
use crate::config::GeminiSettings;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

/// HTTP transport to the Gemini API.
pub struct GeminiTransport {
    endpoint: String,
    client: Client,
}

impl GeminiTransport {
    pub fn new(settings: &GeminiSettings) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.read_timeout)
            .build()
            .map_err(|e| {
                AppError::InternalError(anyhow::anyhow!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            endpoint: settings.endpoint_url(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl UpstreamTransport for GeminiTransport {
    async fn generate_content(
        &self,
        api_key: &Secret<String>,
        payload: &GenerateContentRequest,
    ) -> Result<UpstreamReply, TransportError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", api_key.expose_secret())])
            .json(payload)
            .send()
            .await
            .map_err(transport_error)?;

        // A status was received, so a failed body read is no longer a
        // transport failure.
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| e.without_url().to_string());

        Ok(UpstreamReply { status, body })
    }
}

/// The request URL carries the API key, so it is stripped before the error
/// text can reach logs or clients.
fn transport_error(err: reqwest::Error) -> TransportError {
    TransportError(err.without_url().to_string())
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    /// Single-turn user request with one text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(text.into()),
                }],
            }],
        }
    }

    /// Text of the first part of the first entry.
    pub fn first_text(&self) -> Option<&str> {
        self.contents
            .first()
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

/// Pull `candidates[0].content.parts[0].text` out of a response body.
///
/// Returns `None` for anything that is not that exact shape.
pub fn extract_reply(body: &str) -> Option<String> {
    let response: GenerateContentResponse = serde_json::from_str(body).ok()?;

    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text
}
