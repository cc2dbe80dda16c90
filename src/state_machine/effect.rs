//! Effects produced by state transitions

use crate::llm::{ErrorInfo, Source};
use crate::state_machine::state::Sender;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a message to the log (id and timestamp assigned on apply)
    AppendMessage {
        sender: Sender,
        text: String,
        sources: Vec<Source>,
    },

    /// Replace the surfaced error
    SetError(Option<ErrorInfo>),

    /// Start the reply request for the submitted text
    RequestReply { text: String },
}

impl Effect {
    pub fn append_user(text: impl Into<String>) -> Self {
        Effect::AppendMessage {
            sender: Sender::User,
            text: text.into(),
            sources: Vec::new(),
        }
    }

    pub fn append_assistant(text: impl Into<String>, sources: Vec<Source>) -> Self {
        Effect::AppendMessage {
            sender: Sender::Assistant,
            text: text.into(),
            sources,
        }
    }
}
