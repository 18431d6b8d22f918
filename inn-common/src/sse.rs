//! Server-Sent Events (SSE) utilities
//!
//! Streams contest events to browsers so dashboards no longer poll for
//! round and telecast state.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::events::ContestEvent;

/// Create an SSE stream that starts with a snapshot and then relays bus events
///
/// # Arguments
/// * `service_name` - Name of the service for logging
/// * `snapshot` - JSON sent first as a `Snapshot` event (current rounds/telecast)
/// * `rx` - Receiver obtained from `EventBus::subscribe` before the snapshot was read
pub fn create_contest_sse_stream(
    service_name: &'static str,
    snapshot: serde_json::Value,
    mut rx: broadcast::Receiver<ContestEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} contest events", service_name);

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("Snapshot")
            .data(snapshot.to_string()));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    debug!(event_type = event.event_type(), "SSE: relaying event");
                    match serde_json::to_string(&event) {
                        Ok(data) => yield Ok(Event::default().event(event.event_type()).data(data)),
                        Err(e) => warn!("SSE: failed to serialize event: {}", e),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE: client lagged, {} events skipped", skipped);
                    yield Ok(Event::default().event("Lagged").data(skipped.to_string()));
                }
                Err(RecvError::Closed) => {
                    info!("SSE: {} event bus closed", service_name);
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
