//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    ChatRequest, ChatResponse, ConversationResponse, CreateConversationRequest, ErrorResponse,
    SuccessResponse,
};
use super::AppState;
use crate::runtime::ConversationController;
use crate::state_machine::Message;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/conversations/new", post(create_conversation))
        .route("/api/conversations/:id", get(get_conversation))
        .route("/api/conversations/:id/stream", get(stream_conversation))
        .route("/api/conversations/:id/chat", post(send_chat))
        .route("/api/conversations/:id/end", post(end_conversation))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Conversation Lifecycle
// ============================================================

async fn create_conversation(
    State(state): State<AppState>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<Json<ConversationResponse>, AppError> {
    let seed = req
        .seed
        .map(|seed| {
            seed.into_iter()
                .map(|m| {
                    if m.text.trim().is_empty() {
                        Err(AppError::BadRequest("Seed messages must have text".into()))
                    } else {
                        Ok(Message::new(m.sender, m.text, Vec::new()))
                    }
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    let conversation = state.sessions.create(seed).await;
    Ok(Json(ConversationResponse {
        conversation: conversation.snapshot(),
    }))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    let conversation = lookup(&state, &id).await?;
    Ok(Json(ConversationResponse {
        conversation: conversation.snapshot(),
    }))
}

async fn end_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if state.sessions.end(&id).await {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(not_found(&id))
    }
}

// ============================================================
// Chat
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let conversation = lookup(&state, &id).await?;

    // The reply task runs detached; its outcome arrives over the stream
    let response = match conversation.submit(&req.text) {
        Ok(_) => ChatResponse {
            queued: true,
            reason: None,
        },
        Err(e) => ChatResponse {
            queued: false,
            reason: Some(e.to_string()),
        },
    };
    Ok(Json(response))
}

async fn stream_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let conversation = lookup(&state, &id).await?;
    let (snapshot, rx) = conversation.subscribe();
    Ok(sse_stream(snapshot, rx))
}

async fn get_version() -> &'static str {
    concat!("gemini-chat ", env!("CARGO_PKG_VERSION"))
}

async fn lookup(state: &AppState, id: &str) -> Result<ConversationController, AppError> {
    state.sessions.get(id).await.ok_or_else(|| not_found(id))
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Conversation not found: {id}"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
