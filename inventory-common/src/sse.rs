//! Server-Sent Events (SSE) utilities

use crate::events::{EntityKind, EventBus};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

const HEARTBEAT: Duration = Duration::from_secs(15);

/// Stream committed changes to an SSE client
///
/// `filter` limits the stream to the listed entity classes; an empty slice
/// forwards everything. Each event is named after its entity class and
/// carries the JSON-encoded [`crate::events::ChangeEvent`].
pub fn change_stream(
    event_bus: &EventBus,
    filter: Vec<EntityKind>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(subscribers = event_bus.subscriber_count(), "New SSE client connected to change events");

    let mut rx = event_bus.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("ConnectionStatus").data("connected"));

        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = rx.recv() => {
                    match received {
                        Ok(event) => {
                            if !filter.is_empty() && !filter.contains(&event.entity) {
                                continue;
                            }
                            match serde_json::to_string(&event) {
                                Ok(json) => {
                                    yield Ok(Event::default().event(event.event_type()).data(json));
                                }
                                Err(e) => {
                                    warn!("SSE: Failed to serialize change event: {}", e);
                                }
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "SSE: client lagged behind change events");
                        }
                        Err(RecvError::Closed) => {
                            info!("SSE: event bus closed, ending stream");
                            break;
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(HEARTBEAT).text("heartbeat"))
}
