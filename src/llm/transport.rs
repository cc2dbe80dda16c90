//! Single-attempt HTTP transport

use super::error::BuildError;
use super::TransportError;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Status and body of one completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues exactly one POST per call; retries live above this layer
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, payload: &Value) -> Result<HttpReply, TransportError>;

    /// Endpoint description for logs (never includes credentials)
    fn endpoint(&self) -> &str;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn post(&self, payload: &Value) -> Result<HttpReply, TransportError> {
        (**self).post(payload).await
    }

    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }
}

/// reqwest-backed transport posting JSON to a fixed endpoint
pub struct ReqwestTransport {
    client: Client,
    /// Endpoint without credentials, for logs
    url: String,
    /// Endpoint with the `key` query parameter, if any
    request_url: Url,
}

impl ReqwestTransport {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BuildError> {
        let url = url.into();
        let request_url = parse_endpoint(&url, api_key.as_deref())?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            request_url,
        })
    }
}

fn parse_endpoint(url: &str, api_key: Option<&str>) -> Result<Url, BuildError> {
    let invalid = |reason: String| BuildError::InvalidUrl {
        url: url.to_string(),
        reason,
    };

    let mut parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        parsed.query_pairs_mut().append_pair("key", key);
    }
    Ok(parsed)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, payload: &Value) -> Result<HttpReply, TransportError> {
        let response = self
            .client
            .post(self.request_url.clone())
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpReply { status, body })
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}
