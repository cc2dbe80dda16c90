//! Reply error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error surfaced to callers of the reply pipeline, with classification
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn rate_limited(body: &str) -> Self {
        let message = if body.trim().is_empty() {
            "Rate limit exceeded (429)".to_string()
        } else {
            format!("Rate limit exceeded (429): {}", body.trim())
        };
        Self::new(ErrorKind::RateLimited, message).with_status(429)
    }

    pub fn http(status: u16, body: &str) -> Self {
        Self::new(ErrorKind::HttpError, format!("HTTP Error: {status} - {body}")).with_status(status)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidResponse, message)
    }

    pub fn cancelled(attempts: u32) -> Self {
        Self::new(
            ErrorKind::Cancelled,
            format!("Request cancelled after {attempts} attempt(s)"),
        )
    }

    /// Wrap the last retryable failure once the attempt budget is spent.
    pub fn exhausted(attempts: u32, last: Option<&ErrorInfo>) -> Self {
        let detail = last.map_or("no attempt completed", |e| e.message.as_str());
        Self {
            kind: ErrorKind::ExhaustedRetries,
            message: format!("Failed after {attempts} retries: {detail}"),
            status_code: last.and_then(|e| e.status_code),
        }
    }

    /// Short text for the UI error banner
    pub fn summary(&self) -> String {
        match self.status_code {
            Some(status) => format!("{} ({status})", self.kind.label()),
            None => self.kind.label().to_string(),
        }
    }
}

/// Error classification for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// HTTP 429 - retryable with backoff
    RateLimited,
    /// Any other non-2xx status - terminal unless the policy retries 5xx
    HttpError,
    /// Connection refused, timeout, DNS, body read - retryable
    NetworkError,
    /// Request could not be built or followed (bad URL, redirect loop) - terminal
    InvalidRequest,
    /// Retry budget spent on retryable failures
    ExhaustedRetries,
    /// 2xx body without usable reply text
    InvalidResponse,
    /// Cancellation token fired mid-request
    Cancelled,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::NetworkError)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::RateLimited => "Rate limited",
            Self::HttpError => "HTTP error",
            Self::NetworkError => "Network error",
            Self::InvalidRequest => "Invalid request",
            Self::ExhaustedRetries => "Retries exhausted",
            Self::InvalidResponse => "Invalid response",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// Transport-level failure for a single attempt
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timeout: {0}")]
    Timeout(String),
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Request failed: {0}")]
    Send(String),
    #[error("Failed to read response: {0}")]
    Body(String),
    /// Never left the client; retrying cannot help
    #[error("Invalid request: {0}")]
    Invalid(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::Invalid(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        // The URL carries the API key as a query parameter
        let e = e.without_url();
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(e.to_string())
        } else if e.is_request() {
            TransportError::Send(e.to_string())
        } else {
            TransportError::Invalid(e.to_string())
        }
    }
}

impl From<TransportError> for ErrorInfo {
    fn from(e: TransportError) -> Self {
        if e.is_retryable() {
            ErrorInfo::network(e.to_string())
        } else {
            ErrorInfo::invalid_request(e.to_string())
        }
    }
}

/// Errors building the reply service
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
