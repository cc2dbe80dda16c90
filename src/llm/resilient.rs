//! Resilient request client
//!
//! Wraps a [`Transport`] with retry on transient failures. Only HTTP 429 and
//! network failures are transient by default; a request that could not be
//! built and every other non-2xx status are returned after a single attempt.

use super::backoff::{Jitter, RandomJitter, RetryPolicy, Sleeper, TokioSleeper};
use super::transport::{HttpReply, Transport};
use super::{ErrorInfo, ErrorKind};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Default number of attempts per logical request
pub const DEFAULT_MAX_RETRIES: u32 = 5;

pub struct ResilientClient<T: Transport> {
    transport: T,
    policy: RetryPolicy,
    jitter: Arc<dyn Jitter>,
    sleeper: Arc<dyn Sleeper>,
}

impl<T: Transport> ResilientClient<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            jitter: Arc::new(RandomJitter),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_jitter(mut self, jitter: Arc<dyn Jitter>) -> Self {
        self.jitter = jitter;
        self
    }

    #[cfg(test)]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Send `payload`, retrying transient failures up to `max_retries` attempts.
    pub async fn send(&self, payload: &Value, max_retries: u32) -> Result<String, ErrorInfo> {
        self.send_cancellable(payload, max_retries, &CancellationToken::new())
            .await
    }

    /// Like [`send`](Self::send), but gives up as soon as `cancel` fires,
    /// whether mid-attempt or mid-backoff.
    pub async fn send_cancellable(
        &self,
        payload: &Value,
        max_retries: u32,
        cancel: &CancellationToken,
    ) -> Result<String, ErrorInfo> {
        let attempts = max_retries.max(1);
        let mut last_error: Option<ErrorInfo> = None;

        for attempt in 0..attempts {
            let outcome = tokio::select! {
                outcome = self.transport.post(payload) => outcome,
                () = cancel.cancelled() => return Err(ErrorInfo::cancelled(attempt)),
            };

            let error = match outcome {
                Ok(reply) if reply.is_success() => return Ok(reply.body),
                Ok(reply) => Self::classify(&reply),
                Err(e) => ErrorInfo::from(e),
            };

            if !self.is_retryable(&error) {
                tracing::debug!(
                    endpoint = %self.transport.endpoint(),
                    attempt,
                    kind = ?error.kind,
                    status = ?error.status_code,
                    "Terminal error, not retrying"
                );
                return Err(error);
            }

            if attempt + 1 < attempts {
                let delay = self.policy.delay(attempt, self.jitter.as_ref());
                tracing::warn!(
                    endpoint = %self.transport.endpoint(),
                    attempt,
                    kind = ?error.kind,
                    status = ?error.status_code,
                    delay_ms = %delay.as_millis(),
                    error = %error.message,
                    "Transient failure, backing off"
                );
                tokio::select! {
                    () = self.sleeper.sleep(delay) => {}
                    () = cancel.cancelled() => return Err(ErrorInfo::cancelled(attempt + 1)),
                }
            }
            last_error = Some(error);
        }

        tracing::warn!(
            endpoint = %self.transport.endpoint(),
            attempts,
            "Retry budget exhausted"
        );
        Err(ErrorInfo::exhausted(attempts, last_error.as_ref()))
    }

    fn classify(reply: &HttpReply) -> ErrorInfo {
        match reply.status {
            429 => ErrorInfo::rate_limited(&reply.body),
            status => ErrorInfo::http(status, &reply.body),
        }
    }

    fn is_retryable(&self, error: &ErrorInfo) -> bool {
        match error.kind {
            ErrorKind::HttpError if self.policy.retry_server_errors => {
                error.status_code.is_some_and(|s| (500..600).contains(&s))
            }
            kind => kind.is_retryable(),
        }
    }
}
