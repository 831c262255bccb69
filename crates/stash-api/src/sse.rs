//! Server-Sent-Events adapter for a run's event stream.
//!
//! Each [`SyncEvent`] becomes one SSE frame whose event name is the event's
//! tag and whose data is the event as JSON. The stream ends right after the
//! terminal event, so the HTTP response closes once the run is finished.
//! A client that disconnects early only drops the receiver; the run keeps
//! going.

use axum::response::sse::Event;
use futures::{Stream, stream};
use stash_sync::SyncEvent;
use tokio::sync::mpsc::UnboundedReceiver;

/// Render one event as an SSE frame.
pub fn frame(event: &SyncEvent) -> Result<Event, axum::Error> {
  Event::default().event(event.name()).json_data(event)
}

/// Adapt a run's receiver into an SSE body stream.
pub fn event_stream(
  events: UnboundedReceiver<SyncEvent>,
) -> impl Stream<Item = Result<Event, axum::Error>> + Send + 'static {
  stream::unfold(Some(events), |events| async move {
    let mut events = events?;
    let event = events.recv().await?;
    let next = (!event.is_terminal()).then_some(events);
    Some((frame(&event), next))
  })
}
