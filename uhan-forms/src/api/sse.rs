//! Service-wide Server-Sent Events

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /api/events
///
/// Streams every `FormEvent`: session lifecycle, saves, exports and member
/// changes.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    uhan_common::sse::create_event_sse_stream("uhan-forms", &state.events)
}
