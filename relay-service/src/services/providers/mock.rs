//! Scripted transport for tests.

use super::{GenerateContentRequest, TransportError, UpstreamReply, UpstreamTransport};
use async_trait::async_trait;
use secrecy::Secret;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Replays queued outcomes in order and records what it was asked to send.
///
/// Once the script is exhausted every further call is a transport failure.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<UpstreamReply, TransportError>>>,
    calls: AtomicUsize,
    last_payload: Mutex<Option<GenerateContentRequest>>,
}

impl ScriptedTransport {
    pub fn new<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = Result<UpstreamReply, TransportError>>,
    {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Transport that answers 200 with a single-candidate body holding `text`.
    pub fn replying(text: &str) -> Self {
        Self::new([Ok(UpstreamReply::new(200, candidate_body(text)))])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_payload(&self) -> Option<GenerateContentRequest> {
        self.last_payload
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl UpstreamTransport for ScriptedTransport {
    async fn generate_content(
        &self,
        _api_key: &Secret<String>,
        payload: &GenerateContentRequest,
    ) -> Result<UpstreamReply, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_payload
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(payload.clone());

        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("script exhausted".to_string())))
    }
}

/// Minimal successful `generateContent` response body.
pub fn candidate_body(text: &str) -> String {
    serde_json::json!({
        "candidates": [
            {"content": {"role": "model", "parts": [{"text": text}]}, "finishReason": "STOP"}
        ]
    })
    .to_string()
}
