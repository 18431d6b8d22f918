//! Server-Sent Events for contest state
//!
//! Clients get a `Snapshot` of rounds and telecast on connect, then every
//! `ContestEvent` as it happens, instead of polling.

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;

use crate::db::{rounds, telecast};
use crate::{ApiResult, AppState};

/// GET /api/contest/events
pub async fn event_stream(
    State(state): State<AppState>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    // Subscribe before reading so nothing emitted in between is lost
    let rx = state.event_bus.subscribe();

    let snapshot = json!({
        "rounds": rounds::list_rounds(&state.db).await?,
        "telecast": telecast::get_telecast(&state.db).await?,
    });

    Ok(inn_common::sse::create_contest_sse_stream(
        "inn-server",
        snapshot,
        rx,
    ))
}
