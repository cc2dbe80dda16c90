//! API request and response types

use crate::state_machine::{ConversationSnapshot, Sender};
use serde::{Deserialize, Serialize};

/// Request to create a new conversation
#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    /// Prior history to start from; replaces the configured greeting
    #[serde(default)]
    pub seed: Option<Vec<SeedMessage>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedMessage {
    pub sender: Sender,
    pub text: String,
}

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Response with a single conversation
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation: ConversationSnapshot,
}

/// Response for chat action
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub queued: bool,
    /// Why the message was not queued
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
