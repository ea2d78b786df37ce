//! Server-sent update stream.
//!
//! Each connection gets its own bounded subscription; dropping the stream
//! (client went away) unsubscribes it. The first event is a `connected`
//! marker, then every broadcast update arrives as one JSON `data:` frame.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use tracing::debug;

use crate::AppState;

/// GET /api/events
pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.monitor.subscribe();
    debug!("event stream attached");

    let connected = stream::once(async {
        Ok::<_, Infallible>(Event::default().data(r#"{"type":"connected"}"#))
    });

    let updates = stream::unfold(subscription, |mut subscription| async move {
        let update = subscription.recv().await?;
        let payload = serde_json::to_string(&update).ok()?;
        Some((Ok(Event::default().data(payload)), subscription))
    });

    Sse::new(connected.chain(updates)).keep_alive(KeepAlive::default())
}
