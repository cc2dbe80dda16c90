//! Reply pipeline
//!
//! A [`Backend`] shapes the outbound JSON and parses the reply body, a
//! [`ResilientClient`] carries the request across transient failures, and
//! [`ReplyService`] is the one capability the conversation layer sees.

pub mod backoff;
mod chatbot;
mod error;
mod gemini;
mod registry;
mod resilient;
pub mod transport;
mod types;

pub use chatbot::ChatbotBackend;
pub use error::{ErrorInfo, ErrorKind, TransportError};
pub use gemini::GeminiBackend;
pub use registry::{build_reply_service, BackendKind, LlmConfig};
pub use resilient::{ResilientClient, DEFAULT_MAX_RETRIES};
pub use types::*;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use transport::Transport;

/// Request shaping and response parsing for one remote API
pub trait Backend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// JSON body for a single user text
    fn build_payload(&self, text: &str) -> Value;

    /// Extract the reply from a 2xx body
    fn parse_reply(&self, body: &str) -> Result<Reply, ErrorInfo>;
}

/// "Send text, receive text or error"
#[async_trait]
pub trait ReplyService: Send + Sync {
    async fn reply(&self, text: &str) -> Result<Reply, ErrorInfo>;

    fn backend_name(&self) -> &str;
}

#[async_trait]
impl<T: ReplyService + ?Sized> ReplyService for Arc<T> {
    async fn reply(&self, text: &str) -> Result<Reply, ErrorInfo> {
        (**self).reply(text).await
    }

    fn backend_name(&self) -> &str {
        (**self).backend_name()
    }
}

/// Backend composed with the resilient client
pub struct BackendService<B: Backend, T: Transport> {
    backend: B,
    client: ResilientClient<T>,
    max_retries: u32,
}

impl<B: Backend, T: Transport> BackendService<B, T> {
    pub fn new(backend: B, client: ResilientClient<T>, max_retries: u32) -> Self {
        Self {
            backend,
            client,
            max_retries,
        }
    }
}

#[async_trait]
impl<B: Backend, T: Transport> ReplyService for BackendService<B, T> {
    async fn reply(&self, text: &str) -> Result<Reply, ErrorInfo> {
        let payload = self.backend.build_payload(text);
        let body = self.client.send(&payload, self.max_retries).await?;
        self.backend.parse_reply(&body)
    }

    fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

/// Logging wrapper for reply services
pub struct LoggingService {
    inner: Arc<dyn ReplyService>,
    backend: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn ReplyService>) -> Self {
        let backend = inner.backend_name().to_string();
        Self { inner, backend }
    }
}

#[async_trait]
impl ReplyService for LoggingService {
    async fn reply(&self, text: &str) -> Result<Reply, ErrorInfo> {
        let start = std::time::Instant::now();
        let result = self.inner.reply(text).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    backend = %self.backend,
                    duration_ms = %duration.as_millis(),
                    reply_chars = reply.text.chars().count(),
                    sources = reply.sources.len(),
                    "Reply received"
                );
            }
            Err(e) => {
                tracing::error!(
                    backend = %self.backend,
                    duration_ms = %duration.as_millis(),
                    kind = ?e.kind,
                    status = ?e.status_code,
                    summary = %e.summary(),
                    error = %e.message,
                    "Reply failed"
                );
            }
        }

        result
    }

    fn backend_name(&self) -> &str {
        &self.backend
    }
}
