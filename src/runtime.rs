//! Runtime for live conversations
//!
//! Each conversation is driven by a [`ConversationController`]; the
//! [`SessionManager`] owns them and hands out clones to the API layer.

mod controller;

#[cfg(test)]
pub mod testing;

pub use controller::ConversationController;

use crate::llm::{ErrorInfo, Reply, ReplyService};
use crate::state_machine::Message;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Changes pushed to subscribers of one conversation
#[derive(Debug, Clone)]
pub enum SseEvent {
    Message { message: Message },
    StateChange { pending: bool },
    Error { error: ErrorInfo },
    ReplyDone,
}

/// Bounds on how many conversations stay in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Creating past this evicts the least recently active conversation
    pub max_sessions: usize,
    /// Conversations untouched this long are dropped by the sweeper
    pub idle_timeout: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: 1000,
            idle_timeout: Duration::from_secs(60 * 60),
        }
    }
}

impl SessionLimits {
    fn sweep_interval(&self) -> Duration {
        (self.idle_timeout / 4).clamp(Duration::from_secs(1), Duration::from_secs(60))
    }
}

/// Manager for all live conversations
pub struct SessionManager {
    service: Arc<dyn ReplyService>,
    greeting: Option<String>,
    limits: SessionLimits,
    sessions: RwLock<HashMap<String, ConversationController>>,
}

impl SessionManager {
    #[cfg(test)]
    pub fn new(service: Arc<dyn ReplyService>, greeting: Option<String>) -> Self {
        Self::with_limits(service, greeting, SessionLimits::default())
    }

    pub fn with_limits(
        service: Arc<dyn ReplyService>,
        greeting: Option<String>,
        limits: SessionLimits,
    ) -> Self {
        Self {
            service,
            greeting: greeting.filter(|g| !g.trim().is_empty()),
            limits: SessionLimits {
                max_sessions: limits.max_sessions.max(1),
                ..limits
            },
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Periodically drop idle conversations. The task exits once the
    /// manager is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let manager_weak = Arc::downgrade(self);
        let period = self.limits.sweep_interval();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                let Some(manager) = manager_weak.upgrade() else {
                    tracing::debug!("SessionManager dropped, sweeper exiting");
                    break;
                };
                manager.sweep().await;
            }
        })
    }

    /// Drop conversations idle past the timeout. A conversation waiting on a
    /// reply is never idle.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let idle_timeout = self.limits.idle_timeout;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, conv| {
            let keep =
                conv.is_pending() || now.duration_since(conv.last_activity()) < idle_timeout;
            if !keep {
                tracing::debug!(conv_id = %id, "Idle conversation expired");
            }
            keep
        });

        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, active = sessions.len(), "Swept idle conversations");
        }
        removed
    }

    /// Start a conversation. Without a seed it opens with the greeting, if any.
    pub async fn create(&self, seed: Option<Vec<Message>>) -> ConversationController {
        let seed = seed.unwrap_or_else(|| {
            self.greeting
                .iter()
                .map(|g| Message::assistant(Reply::text(g.clone())))
                .collect()
        });
        let id = uuid::Uuid::new_v4().to_string();
        let controller = ConversationController::new(id.clone(), seed, self.service.clone());

        let mut sessions = self.sessions.write().await;
        while sessions.len() >= self.limits.max_sessions {
            // Idle ones go first, then the least recently active
            let Some(oldest) = sessions
                .values()
                .min_by_key(|c| (c.is_pending(), c.last_activity()))
                .map(|c| c.id().to_string())
            else {
                break;
            };
            sessions.remove(&oldest);
            tracing::info!(conv_id = %oldest, "Conversation evicted at session limit");
        }
        sessions.insert(id, controller.clone());
        let active = sessions.len();
        drop(sessions);

        tracing::info!(
            conv_id = %controller.id(),
            backend = self.service.backend_name(),
            active,
            "Conversation created"
        );
        controller
    }

    pub async fn get(&self, id: &str) -> Option<ConversationController> {
        let conv = self.sessions.read().await.get(id).cloned()?;
        conv.touch();
        Some(conv)
    }

    /// Forget a conversation. An in-flight reply still settles on the
    /// controller but nobody can reach it anymore.
    pub async fn end(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(conv_id = %id, "Conversation ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
