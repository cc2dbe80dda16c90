//! Reply service construction from configuration

use super::backoff::{RetryPolicy, SeededJitter};
use super::error::BuildError;
use super::gemini::{self, GeminiBackend};
use super::transport::{ReqwestTransport, Transport};
use super::{BackendService, ChatbotBackend, LoggingService, ReplyService, ResilientClient};
use std::sync::Arc;
use std::time::Duration;

/// Which remote API replies come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Gemini,
    Chatbot,
}

impl BackendKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Some(Self::Gemini),
            "chatbot" => Some(Self::Chatbot),
            _ => None,
        }
    }
}

/// Configuration for the reply pipeline
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: BackendKind,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    /// Full endpoint URL; derived from the model when unset
    pub gemini_endpoint: Option<String>,
    pub grounded: bool,
    pub system_prompt: Option<String>,
    pub chatbot_url: Option<String>,
    pub max_retries: u32,
    pub retry_policy: RetryPolicy,
    /// Fixed jitter seed for reproducible backoff schedules
    pub jitter_seed: Option<u64>,
    pub request_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Gemini,
            gemini_api_key: None,
            gemini_model: gemini::DEFAULT_MODEL.to_string(),
            gemini_endpoint: None,
            grounded: true,
            system_prompt: Some(gemini::DEFAULT_SYSTEM_PROMPT.to_string()),
            chatbot_url: None,
            max_retries: super::DEFAULT_MAX_RETRIES,
            retry_policy: RetryPolicy::default(),
            jitter_seed: None,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl LlmConfig {
    /// URL the configured backend posts to
    pub fn endpoint(&self) -> Option<String> {
        match self.backend {
            BackendKind::Gemini => Some(
                self.gemini_endpoint
                    .clone()
                    .unwrap_or_else(|| gemini::endpoint_for(&self.gemini_model)),
            ),
            BackendKind::Chatbot => self.chatbot_url.clone(),
        }
    }
}

/// Build the production reply service, wrapped with logging
pub fn build_reply_service(config: &LlmConfig) -> Result<Arc<dyn ReplyService>, BuildError> {
    let service: Arc<dyn ReplyService> = match config.backend {
        BackendKind::Gemini => {
            let url = config.endpoint().unwrap_or_default();
            let transport =
                ReqwestTransport::new(url, config.gemini_api_key.clone(), config.request_timeout)?;
            let backend = GeminiBackend::new(config.system_prompt.clone(), config.grounded);
            Arc::new(BackendService::new(backend, client(transport, config), config.max_retries))
        }
        BackendKind::Chatbot => {
            let url = config.endpoint().unwrap_or_default();
            let transport = ReqwestTransport::new(url, None, config.request_timeout)?;
            Arc::new(BackendService::new(
                ChatbotBackend,
                client(transport, config),
                config.max_retries,
            ))
        }
    };

    Ok(Arc::new(LoggingService::new(service)))
}

fn client<T: Transport>(transport: T, config: &LlmConfig) -> ResilientClient<T> {
    let client = ResilientClient::new(transport, config.retry_policy);
    match config.jitter_seed {
        Some(seed) => client.with_jitter(Arc::new(SeededJitter::new(seed))),
        None => client,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!(BackendKind::parse("Gemini"), Some(BackendKind::Gemini));
        assert_eq!(BackendKind::parse(" chatbot "), Some(BackendKind::Chatbot));
        assert_eq!(BackendKind::parse("openai"), None);
    }

    #[test]
    fn test_endpoint_override() {
        let config = LlmConfig {
            gemini_endpoint: Some("http://gw/generate".into()),
            ..LlmConfig::default()
        };
        assert_eq!(config.endpoint().as_deref(), Some("http://gw/generate"));
        assert_eq!(
            LlmConfig::default().endpoint(),
            Some(gemini::endpoint_for(gemini::DEFAULT_MODEL))
        );
    }

    #[test]
    fn test_unusable_endpoint_fails_to_build() {
        let config = LlmConfig {
            backend: BackendKind::Chatbot,
            ..LlmConfig::default()
        };
        assert!(matches!(
            build_reply_service(&config),
            Err(BuildError::InvalidUrl { .. })
        ));

        let config = LlmConfig {
            gemini_endpoint: Some("gw/generate".into()),
            ..LlmConfig::default()
        };
        assert!(matches!(
            build_reply_service(&config),
            Err(BuildError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_chatbot_end_to_end_with_rate_limit() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/bot",
            post(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (StatusCode::TOO_MANY_REQUESTS, String::new())
                    } else {
                        (StatusCode::OK, r#"{"response":"pong"}"#.to_string())
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = LlmConfig {
            backend: BackendKind::Chatbot,
            chatbot_url: Some(format!("http://{addr}/bot")),
            retry_policy: RetryPolicy {
                base_delay: Duration::from_millis(5),
                max_jitter: Duration::from_millis(5),
                retry_server_errors: false,
            },
            ..LlmConfig::default()
        };
        let service = build_reply_service(&config).unwrap();

        let reply = service.reply("ping").await.unwrap();
        assert_eq!(reply.text, "pong");
        assert_eq!(service.backend_name(), "chatbot");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
