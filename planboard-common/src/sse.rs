//! Server-Sent Events (SSE) utilities
//!
//! Turns the board's [`EventBus`] into an SSE response. Each event carries the
//! variant name as its SSE event name and the serialized variant as data.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::events::{BoardEvent, EventBus};

/// Keep-alive comment interval
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Convert one board event into an SSE event
pub fn to_sse_event(event: &BoardEvent) -> Option<Event> {
    match Event::default().event(event.event_type()).json_data(event) {
        Ok(sse_event) => Some(sse_event),
        Err(e) => {
            warn!("Failed to serialize {} for SSE: {}", event.event_type(), e);
            None
        }
    }
}

/// Stream of board events for one client
///
/// Starts with a `ConnectionStatus` event. A client that falls behind skips
/// the events it missed and keeps streaming.
pub fn board_event_stream(bus: &EventBus) -> impl Stream<Item = Result<Event, Infallible>> {
    let rx = bus.subscribe();
    let connected = futures::stream::once(async {
        Ok(Event::default().event("ConnectionStatus").data("connected"))
    });

    let events = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => to_sse_event(&event).map(Ok),
            Err(e) => {
                warn!("SSE client lagging: {}", e);
                None
            }
        }
    });

    connected.chain(events)
}

/// SSE response for `GET /api/events`
pub fn board_event_sse(bus: &EventBus) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected, total clients: {}", bus.subscriber_count() + 1);

    Sse::new(board_event_stream(bus)).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("heartbeat"),
    )
}
