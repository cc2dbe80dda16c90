//! HTTP API for the chat front end

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::llm::ReplyService;
use crate::runtime::{SessionLimits, SessionManager};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(
        service: Arc<dyn ReplyService>,
        greeting: Option<String>,
        limits: SessionLimits,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionManager::with_limits(service, greeting, limits)),
        }
    }
}
