//! Startup configuration from environment variables

use crate::llm::backoff::RetryPolicy;
use crate::llm::{BackendKind, LlmConfig};
use crate::runtime::SessionLimits;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: unknown backend '{value}' (expected gemini or chatbot)")]
    UnknownBackend { var: &'static str, value: String },
    #[error("{var}: invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
    #[error("CHATBOT_URL must be set when CHAT_BACKEND=chatbot")]
    MissingChatbotUrl,
}

/// Everything the server needs at startup
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub llm: LlmConfig,
    pub port: u16,
    /// Assistant message new conversations open with
    pub greeting: Option<String>,
    pub sessions: SessionLimits,
}

impl ChatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = LlmConfig::default();

        let backend = match get("CHAT_BACKEND") {
            Some(value) => {
                BackendKind::parse(&value).ok_or(ConfigError::UnknownBackend {
                    var: "CHAT_BACKEND",
                    value,
                })?
            }
            None => BackendKind::default(),
        };

        let chatbot_url = non_empty(get("CHATBOT_URL"));
        if backend == BackendKind::Chatbot && chatbot_url.is_none() {
            return Err(ConfigError::MissingChatbotUrl);
        }

        // Set but empty disables the system instruction
        let system_prompt = match get("CHAT_SYSTEM_PROMPT") {
            Some(prompt) => non_empty(Some(prompt)),
            None => defaults.system_prompt,
        };

        let retry_policy = RetryPolicy {
            retry_server_errors: parse_var(&get, "CHAT_RETRY_SERVER_ERRORS", parse_bool)?
                .unwrap_or(defaults.retry_policy.retry_server_errors),
            ..defaults.retry_policy
        };

        let timeout_secs: Option<u64> = parse_var(&get, "CHAT_REQUEST_TIMEOUT_SECS", parse_positive)?;

        let session_defaults = SessionLimits::default();
        let sessions = SessionLimits {
            max_sessions: parse_var(&get, "CHAT_MAX_SESSIONS", parse_positive)?
                .unwrap_or(session_defaults.max_sessions),
            idle_timeout: parse_var(&get, "CHAT_SESSION_IDLE_SECS", parse_positive)?
                .map_or(session_defaults.idle_timeout, Duration::from_secs),
        };

        let llm = LlmConfig {
            backend,
            gemini_api_key: non_empty(get("GEMINI_API_KEY")),
            gemini_model: non_empty(get("GEMINI_MODEL")).unwrap_or(defaults.gemini_model),
            gemini_endpoint: non_empty(get("GEMINI_ENDPOINT")),
            grounded: parse_var(&get, "CHAT_GROUNDED", parse_bool)?.unwrap_or(defaults.grounded),
            system_prompt,
            chatbot_url,
            max_retries: parse_var(&get, "CHAT_MAX_RETRIES", parse_num)?
                .unwrap_or(defaults.max_retries),
            retry_policy,
            jitter_seed: parse_var(&get, "CHAT_JITTER_SEED", parse_num)?,
            request_timeout: timeout_secs.map_or(defaults.request_timeout, Duration::from_secs),
        };

        Ok(Self {
            llm,
            port: parse_var(&get, "CHAT_PORT", parse_num)?.unwrap_or(DEFAULT_PORT),
            greeting: non_empty(get("CHAT_GREETING")),
            sessions,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>, ConfigError> {
    match non_empty(get(var)) {
        None => Ok(None),
        Some(value) => parse(value.trim())
            .map(Some)
            .ok_or(ConfigError::Invalid { var, value }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_num<T: FromStr>(value: &str) -> Option<T> {
    value.parse().ok()
}

fn parse_positive<T: FromStr + Default + PartialEq>(value: &str) -> Option<T> {
    parse_num(value).filter(|v: &T| *v != T::default())
}
