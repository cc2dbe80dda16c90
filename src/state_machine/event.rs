//! Events that can occur in a conversation

use crate::llm::{ErrorInfo, Reply};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// User submitted input text
    UserSubmit { text: String },

    /// Reply request settled successfully
    ReplyReceived { reply: Reply },

    /// Reply request settled with a terminal error
    RequestFailed { error: ErrorInfo },
}
