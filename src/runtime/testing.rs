//! Mock implementations for testing
//!
//! These mocks enable exercising the retry loop and the controller without
//! real I/O or real time.

use crate::llm::backoff::{Jitter, Sleeper};
use crate::llm::transport::{HttpReply, Transport};
use crate::llm::{ErrorInfo, Reply, ReplyService, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Scripted Transport
// ============================================================================

/// Transport that replays queued outcomes, one per attempt
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpReply, TransportError>>>,
    payloads: Mutex<Vec<Value>>,
    hang: bool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            payloads: Mutex::new(Vec::new()),
            hang: false,
        }
    }

    /// Every post stays in flight forever
    pub fn pending() -> Self {
        Self {
            hang: true,
            ..Self::new()
        }
    }

    pub fn push_reply(&self, status: u16, body: impl Into<String>) {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(HttpReply::new(status, body)));
    }

    pub fn push_error(&self, error: TransportError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    pub fn attempts(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, payload: &Value) -> Result<HttpReply, TransportError> {
        self.payloads.lock().unwrap().push(payload.clone());
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Send("No scripted reply".into())))
    }

    fn endpoint(&self) -> &str {
        "scripted://test"
    }
}

// ============================================================================
// Time and randomness
// ============================================================================

/// Records requested waits and returns immediately
#[derive(Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
    cancel: Option<CancellationToken>,
}

impl RecordingSleeper {
    /// Cancels `token` on the first wait, then never wakes
    pub fn cancelling(token: CancellationToken) -> Self {
        Self {
            waits: Mutex::new(Vec::new()),
            cancel: Some(token),
        }
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
        if let Some(token) = &self.cancel {
            token.cancel();
            std::future::pending::<()>().await;
        }
    }
}

/// Always returns the same jitter
pub struct FixedJitter(pub Duration);

impl Jitter for FixedJitter {
    fn sample(&self, _max: Duration) -> Duration {
        self.0
    }
}

// ============================================================================
// Mock Reply Services
// ============================================================================

/// Reply service that returns queued results immediately
pub struct MockReplyService {
    responses: Mutex<VecDeque<Result<Reply, ErrorInfo>>>,
    requests: Mutex<Vec<String>>,
}

impl MockReplyService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_reply(&self, reply: Reply) {
        self.responses.lock().unwrap().push_back(Ok(reply));
    }

    pub fn queue_error(&self, error: ErrorInfo) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplyService for MockReplyService {
    async fn reply(&self, text: &str) -> Result<Reply, ErrorInfo> {
        self.requests.lock().unwrap().push(text.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ErrorInfo::network("No mock response queued")))
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

/// Reply service whose requests stay in flight until the test releases them
pub struct GatedReplyService {
    release_tx: mpsc::UnboundedSender<Result<Reply, ErrorInfo>>,
    release_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<Reply, ErrorInfo>>>,
    requests: Mutex<Vec<String>>,
}

impl GatedReplyService {
    pub fn new() -> Self {
        let (release_tx, release_rx) = mpsc::unbounded_channel();
        Self {
            release_tx,
            release_rx: tokio::sync::Mutex::new(release_rx),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Settle the oldest waiting request with `result`
    pub fn release(&self, result: Result<Reply, ErrorInfo>) {
        self.release_tx.send(result).unwrap();
    }

    pub fn recorded_requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplyService for GatedReplyService {
    async fn reply(&self, text: &str) -> Result<Reply, ErrorInfo> {
        self.requests.lock().unwrap().push(text.to_string());
        self.release_rx
            .lock()
            .await
            .recv()
            .await
            .unwrap_or_else(|| Err(ErrorInfo::network("gate closed")))
    }

    fn backend_name(&self) -> &str {
        "gated"
    }
}
