//! Chat relay: validate, forward to Gemini with the assistant prompt, map
//! the outcome to a reply or a client-facing error.

use crate::config::GeminiSettings;
use crate::models::{ChatRequest, ChatResponse};
use crate::services::providers::gemini::{GenerateContentRequest, extract_reply};
use crate::services::providers::{TransportError, UpstreamTransport};
use secrecy::Secret;
use service_core::error::AppError;
use service_core::retry::{RetryPolicy, retry_call};
use std::sync::Arc;
use thiserror::Error;

/// Instruction block prepended to every user message.
pub const SYSTEM_PROMPT: &str = "Sen gezgin ruhsar uygulamasının gezi asistanısın...";

/// Marker placed in front of the user's own words.
const USER_LABEL: &str = "Kullanıcı: ";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("GEMINI_API_KEY missing (env var)")]
    ConfigurationMissing,

    #[error("message must not be empty")]
    InvalidInput,

    #[error("Gemini unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("Gemini HTTP {status}: {body}")]
    UpstreamError { status: u16, body: String },

    #[error("Parse error. Raw body: {body}")]
    ResponseParseError { body: String },
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        let detail = err.to_string();
        match err {
            RelayError::ConfigurationMissing => AppError::ConfigError(anyhow::anyhow!(detail)),
            RelayError::InvalidInput => AppError::BadRequest(detail),
            RelayError::UpstreamUnreachable(_) => AppError::GatewayTimeout(detail),
            RelayError::UpstreamError { .. } => AppError::BadGateway(detail),
            RelayError::ResponseParseError { .. } => {
                AppError::InternalError(anyhow::anyhow!(detail))
            }
        }
    }
}

/// Text sent upstream for a (trimmed) user message.
pub fn compose_prompt(message: &str) -> String {
    format!("{}\n\n{}{}", SYSTEM_PROMPT, USER_LABEL, message)
}

/// Single-turn payload for a (trimmed) user message.
pub fn build_payload(message: &str) -> GenerateContentRequest {
    GenerateContentRequest::user_text(compose_prompt(message))
}

pub struct RelayService {
    transport: Arc<dyn UpstreamTransport>,
    api_key: Option<Secret<String>>,
    retry: RetryPolicy,
}

impl RelayService {
    pub fn new(settings: &GeminiSettings, transport: Arc<dyn UpstreamTransport>) -> Self {
        Self {
            transport,
            api_key: settings.api_key.clone(),
            retry: RetryPolicy::with_max_attempts(settings.max_attempts),
        }
    }

    pub async fn handle(&self, request: ChatRequest) -> Result<ChatResponse, RelayError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(RelayError::ConfigurationMissing)?;

        let message = request.message.trim();
        if message.is_empty() {
            return Err(RelayError::InvalidInput);
        }

        let payload = build_payload(message);

        tracing::debug!(message_len = message.len(), "Relaying chat message");

        let reply = retry_call(&self.retry, "gemini_generate_content", || {
            self.transport.generate_content(api_key, &payload)
        })
        .await
        .map_err(|TransportError(reason)| RelayError::UpstreamUnreachable(reason))?;

        if reply.status != 200 {
            return Err(RelayError::UpstreamError {
                status: reply.status,
                body: reply.body_text(),
            });
        }

        let body = match &reply.body {
            Ok(body) => body,
            Err(_) => {
                return Err(RelayError::ResponseParseError {
                    body: reply.body_text(),
                })
            }
        };

        match extract_reply(body) {
            Some(text) => {
                tracing::info!(reply_len = text.len(), "Chat reply relayed");
                Ok(ChatResponse { reply: text })
            }
            None => Err(RelayError::ResponseParseError { body: body.clone() }),
        }
    }
}
