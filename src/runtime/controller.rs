//! Conversation controller
//!
//! Owns one conversation's state, applies transitions, runs the reply request
//! in the background and broadcasts every observable change.

use super::SseEvent;
use crate::llm::ReplyService;
use crate::state_machine::state::Applied;
use crate::state_machine::{
    transition, ConversationSnapshot, ConversationState, Event, Message, TransitionError,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Clone)]
pub struct ConversationController {
    id: String,
    /// Never held across an await
    state: Arc<Mutex<ConversationState>>,
    service: Arc<dyn ReplyService>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    last_activity: Arc<Mutex<Instant>>,
}

impl ConversationController {
    pub fn new(id: impl Into<String>, seed: Vec<Message>, service: Arc<dyn ReplyService>) -> Self {
        let (broadcast_tx, _) = broadcast::channel(128);
        Self {
            id: id.into(),
            state: Arc::new(Mutex::new(ConversationState::with_seed(seed))),
            service,
            broadcast_tx,
            last_activity: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn last_activity(&self) -> Instant {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn touch(&self) {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    pub fn is_pending(&self) -> bool {
        self.lock().pending()
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot::new(&self.id, &self.lock())
    }

    /// Snapshot plus a receiver for every change after it
    pub fn subscribe(&self) -> (ConversationSnapshot, broadcast::Receiver<SseEvent>) {
        self.touch();
        let state = self.lock();
        let rx = self.broadcast_tx.subscribe();
        (ConversationSnapshot::new(&self.id, &state), rx)
    }

    /// Submit user text.
    ///
    /// On success the user message is already in the log and the returned
    /// handle resolves once the reply (or error) has been applied. Blank text
    /// or a submit while a reply is pending leaves the conversation untouched.
    pub fn submit(&self, text: &str) -> Result<JoinHandle<()>, TransitionError> {
        let request = {
            let mut state = self.lock();
            let result = transition(
                state.state,
                Event::UserSubmit {
                    text: text.to_string(),
                },
            )
            .inspect_err(|e| {
                tracing::debug!(conv_id = %self.id, reason = %e, "Submit ignored");
            })?;
            let applied = state.apply(result);
            self.publish(&applied, &state);
            applied.request
        }
        .ok_or_else(|| TransitionError::InvalidTransition("submit produced no request".into()))?;

        self.touch();
        tracing::info!(conv_id = %self.id, chars = request.chars().count(), "User message submitted");

        let controller = self.clone();
        Ok(tokio::spawn(async move {
            controller.request_reply(request).await;
        }))
    }

    async fn request_reply(self, text: String) {
        let event = match self.service.reply(&text).await {
            Ok(reply) => Event::ReplyReceived { reply },
            Err(error) => Event::RequestFailed { error },
        };
        self.settle(event);
    }

    fn settle(&self, event: Event) {
        self.touch();
        let mut state = self.lock();
        match transition(state.state, event) {
            Ok(result) => {
                let applied = state.apply(result);
                self.publish(&applied, &state);
                let _ = self.broadcast_tx.send(SseEvent::ReplyDone);
                tracing::debug!(
                    conv_id = %self.id,
                    messages = state.messages.len(),
                    failed = state.last_error.is_some(),
                    "Reply settled"
                );
            }
            Err(e) => {
                tracing::error!(conv_id = %self.id, error = %e, "Failed to settle reply");
            }
        }
    }

    /// Broadcast while the lock is held so subscribers see changes in order
    fn publish(&self, applied: &Applied, state: &ConversationState) {
        for message in &applied.appended {
            let _ = self.broadcast_tx.send(SseEvent::Message {
                message: message.clone(),
            });
        }
        if applied.error_changed {
            if let Some(error) = &state.last_error {
                let _ = self.broadcast_tx.send(SseEvent::Error {
                    error: error.clone(),
                });
            }
        }
        let _ = self.broadcast_tx.send(SseEvent::StateChange {
            pending: state.pending(),
        });
    }

    fn lock(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
