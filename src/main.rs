//! Gemini Chat - resilient chat backend
//!
//! Serves conversations over HTTP/SSE and forwards user messages to the
//! Gemini generateContent API (or a simple chatbot endpoint) with retry and
//! exponential backoff.

mod api;
mod config;
mod llm;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use config::ChatConfig;
use llm::build_reply_service;
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = ChatConfig::from_env()?;

    let service = build_reply_service(&config.llm)?;
    let endpoint = config.llm.endpoint().unwrap_or_default();
    tracing::info!(
        backend = service.backend_name(),
        endpoint = %endpoint,
        max_retries = config.llm.max_retries,
        retry_server_errors = config.llm.retry_policy.retry_server_errors,
        "Reply service initialized"
    );
    if config.llm.backend == llm::BackendKind::Gemini && config.llm.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; requests will likely be rejected");
    }

    let state = AppState::new(service, config.greeting, config.sessions);
    state.sessions.spawn_sweeper();
    tracing::info!(
        max_sessions = config.sessions.max_sessions,
        idle_timeout_secs = config.sessions.idle_timeout.as_secs(),
        "Session limits configured"
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Gemini chat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
