//! Conversation state types

use super::transition::TransitionResult;
use super::Effect;
use crate::llm::{ErrorInfo, Reply, Source};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

/// One entry in the conversation log; immutable once appended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            text: text.into(),
            sources,
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text, Vec::new())
    }

    pub fn assistant(reply: Reply) -> Self {
        Self::new(Sender::Assistant, reply.text, reply.sources)
    }
}

/// Request lifecycle of a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// Ready for user input, no request in flight
    #[default]
    Idle,

    /// User message appended, reply request in flight
    AwaitingReply,
}

impl ConvState {
    pub fn is_pending(self) -> bool {
        matches!(self, ConvState::AwaitingReply)
    }
}

/// Everything the presentation layer renders for one conversation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub state: ConvState,
    pub last_error: Option<ErrorInfo>,
}

impl ConversationState {
    pub fn with_seed(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn pending(&self) -> bool {
        self.state.is_pending()
    }

    /// Commit a transition: move to the new state and run its state effects.
    ///
    /// Returns the messages appended and, if one was requested, the text to
    /// send. Issuing the request is left to the caller.
    pub fn apply(&mut self, result: TransitionResult) -> Applied {
        self.state = result.new_state;
        let mut applied = Applied::default();

        for effect in result.effects {
            match effect {
                Effect::AppendMessage {
                    sender,
                    text,
                    sources,
                } => {
                    let message = Message::new(sender, text, sources);
                    self.messages.push(message.clone());
                    applied.appended.push(message);
                }
                Effect::SetError(error) => {
                    applied.error_changed = self.last_error != error;
                    self.last_error = error;
                }
                Effect::RequestReply { text } => applied.request = Some(text),
            }
        }

        applied
    }
}

/// Outcome of [`ConversationState::apply`]
#[derive(Debug, Default)]
pub struct Applied {
    pub appended: Vec<Message>,
    pub request: Option<String>,
    pub error_changed: bool,
}

/// Serializable view sent to clients
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSnapshot {
    pub id: String,
    pub messages: Vec<Message>,
    pub pending: bool,
    pub last_error: Option<ErrorInfo>,
}

impl ConversationSnapshot {
    pub fn new(id: impl Into<String>, state: &ConversationState) -> Self {
        Self {
            id: id.into(),
            messages: state.messages.clone(),
            pending: state.pending(),
            last_error: state.last_error.clone(),
        }
    }
}
