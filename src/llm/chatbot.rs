//! Simple chatbot endpoint backend: `{"message"}` in, `{"response"}` out

use super::types::Reply;
use super::{Backend, ErrorInfo};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct ChatbotBackend;

#[derive(Debug, Deserialize)]
struct ChatbotResponse {
    response: String,
}

impl Backend for ChatbotBackend {
    fn name(&self) -> &str {
        "chatbot"
    }

    fn build_payload(&self, text: &str) -> Value {
        json!({ "message": text })
    }

    fn parse_reply(&self, body: &str) -> Result<Reply, ErrorInfo> {
        // Plain-text bodies are accepted as the reply itself
        let text = match serde_json::from_str::<ChatbotResponse>(body) {
            Ok(parsed) => parsed.response,
            Err(_) if serde_json::from_str::<Value>(body).is_ok() => {
                return Err(ErrorInfo::invalid_response(
                    "Chatbot response is missing the `response` field",
                ));
            }
            Err(_) => body.trim().to_string(),
        };

        if text.trim().is_empty() {
            return Err(ErrorInfo::invalid_response("Chatbot returned an empty reply"));
        }
        Ok(Reply::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ErrorKind;

    #[test]
    fn test_payload() {
        assert_eq!(ChatbotBackend.build_payload("hello"), json!({ "message": "hello" }));
    }

    #[test]
    fn test_json_reply() {
        let reply = ChatbotBackend.parse_reply(r#"{"response":"Hi there"}"#).unwrap();
        assert_eq!(reply, Reply::text("Hi there"));
    }

    #[test]
    fn test_plain_text_reply() {
        let reply = ChatbotBackend.parse_reply("  Hello! How can I help?\n").unwrap();
        assert_eq!(reply.text, "Hello! How can I help?");
    }

    #[test]
    fn test_json_without_response_field() {
        let err = ChatbotBackend.parse_reply(r#"{"answer":"x"}"#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidResponse);
    }

    #[test]
    fn test_empty_reply() {
        let err = ChatbotBackend.parse_reply("   ").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidResponse);
    }
}
