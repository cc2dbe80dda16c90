//! Pure state transition function

use super::{ConvState, Effect, Event};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Why an event was not applied; the conversation is left untouched
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A reply is still pending, wait for it before sending again")]
    Busy,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs and performs no I/O.
pub fn transition(state: ConvState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        (_, Event::UserSubmit { text }) if text.trim().is_empty() => {
            Err(TransitionError::EmptyMessage)
        }

        // Idle + UserSubmit -> AwaitingReply (optimistic append)
        (ConvState::Idle, Event::UserSubmit { text }) => {
            Ok(TransitionResult::new(ConvState::AwaitingReply)
                .with_effect(Effect::append_user(text.clone()))
                .with_effect(Effect::SetError(None))
                .with_effect(Effect::RequestReply { text }))
        }

        // Single-flight: one request per conversation
        (ConvState::AwaitingReply, Event::UserSubmit { .. }) => Err(TransitionError::Busy),

        (ConvState::AwaitingReply, Event::ReplyReceived { reply }) => {
            Ok(TransitionResult::new(ConvState::Idle)
                .with_effect(Effect::append_assistant(reply.text, reply.sources)))
        }

        // The user message stays in the log; no assistant message on failure
        (ConvState::AwaitingReply, Event::RequestFailed { error }) => {
            Ok(TransitionResult::new(ConvState::Idle).with_effect(Effect::SetError(Some(error))))
        }

        (ConvState::Idle, Event::ReplyReceived { .. } | Event::RequestFailed { .. }) => Err(
            TransitionError::InvalidTransition("no reply request in flight".to_string()),
        ),
    }
}
