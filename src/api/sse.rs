//! Server-Sent Events support

use crate::runtime::SseEvent;
use crate::state_machine::ConversationSnapshot;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Snapshot as the `init` event, then every broadcast change
pub fn sse_stream(
    init: ConversationSnapshot,
    broadcast_rx: tokio::sync::broadcast::Receiver<SseEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move {
        Ok(Event::default()
            .event("init")
            .data(json!({ "type": "init", "conversation": init }).to_string()))
    });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(sse_event_to_axum(event))),
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn sse_event_to_axum(event: SseEvent) -> Event {
    let (event_type, data) = match event {
        SseEvent::Message { message } => (
            "message",
            json!({
                "type": "message",
                "message": message
            }),
        ),
        SseEvent::StateChange { pending } => (
            "state_change",
            json!({
                "type": "state_change",
                "pending": pending
            }),
        ),
        SseEvent::Error { error } => (
            "error",
            json!({
                "type": "error",
                "error": error
            }),
        ),
        SseEvent::ReplyDone => (
            "reply_done",
            json!({
                "type": "reply_done"
            }),
        ),
    };

    Event::default().event(event_type).data(data.to_string())
}
