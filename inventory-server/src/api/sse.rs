//! Server-Sent Events for committed changes

use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use inventory_common::events::EntityKind;
use serde::Deserialize;
use std::convert::Infallible;
use tracing::warn;

use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Comma-separated entity names; absent means every entity
    pub entities: Option<String>,
}

/// GET /events
///
/// Streams one event per committed change, named after its entity
/// (`product`, `organization`, `person`, `imports`). Unknown names in
/// `entities` are ignored.
pub async fn event_stream(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let filter = query
        .entities
        .as_deref()
        .map(|list| {
            list.split(',')
                .filter(|name| !name.trim().is_empty())
                .filter_map(|name| match name.parse::<EntityKind>() {
                    Ok(kind) => Some(kind),
                    Err(e) => {
                        warn!("SSE: {}", e);
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    inventory_common::sse::change_stream(&state.event_bus, filter)
}

pub fn event_routes() -> Router<AppState> {
    Router::new().route("/events", get(event_stream))
}
