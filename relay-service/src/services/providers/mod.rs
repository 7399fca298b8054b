//! Upstream transport abstraction.
//!
//! A transport performs exactly one outbound attempt. Retrying, status
//! handling and reply extraction belong to the relay.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use secrecy::Secret;
use thiserror::Error;

pub use gemini::{GeminiTransport, GenerateContentRequest};

/// Network-level failure: no HTTP status was received.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Raw outcome of an attempt that reached the upstream.
///
/// `body` is `Err` with the read error when the status arrived but the body
/// could not be read in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: Result<String, String>,
}

impl UpstreamReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: Ok(body.into()),
        }
    }

    pub fn unreadable(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            body: Err(reason.into()),
        }
    }

    /// Body text for diagnostics, with a marker in place of an unreadable body.
    pub fn body_text(&self) -> String {
        match &self.body {
            Ok(body) => body.clone(),
            Err(reason) => format!("<body unreadable: {}>", reason),
        }
    }
}

#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    /// Send one `generateContent` request.
    async fn generate_content(
        &self,
        api_key: &Secret<String>,
        payload: &GenerateContentRequest,
    ) -> Result<UpstreamReply, TransportError>;
}
