// Server-sent event streaming for device view updates
use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use tokio::sync::broadcast;

use crate::domain::view::{DeviceView, ViewEvent};

/// Builds the event-stream response for one subscriber: the full model
/// first, then every update the session broadcasts until it closes.
pub fn view_event_stream(
    initial: DeviceView,
    mut receiver: broadcast::Receiver<ViewEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        yield encode(&ViewEvent::View { view: initial });
        loop {
            match receiver.recv().await {
                Ok(event) => yield encode(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Updates are absolute panel replacements, so skipped
                    // events are not replayed.
                    tracing::warn!(skipped, "event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn encode(event: &ViewEvent) -> Result<Event, Infallible> {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Ok(Event::default().event(event.name()).data(data))
}
