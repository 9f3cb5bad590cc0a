//! Server-Sent Events stream of run progress.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;
use turn_runner::io::run_state::RunState;

use crate::state::{AppState, ChangeEvent};

#[derive(Serialize)]
struct RunStatePayload {
    #[serde(rename = "type")]
    event_type: &'static str,
    state: RunState,
}

/// JSON body of the `change` event for `event`.
///
/// Record updates serialize as `{ "type": "turn_started" | ..., "record": {...} }`.
fn payload(event: &ChangeEvent) -> serde_json::Result<String> {
    match event {
        ChangeEvent::RunStateChanged { state } => serde_json::to_string(&RunStatePayload {
            event_type: "run_state_changed",
            state: *state,
        }),
        ChangeEvent::Record(update) => serde_json::to_string(update),
    }
}

/// SSE endpoint handler.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.event_tx.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("connected").data("{}"));

        loop {
            match rx.recv().await {
                Ok(change_event) => match payload(&change_event) {
                    Ok(json) => yield Ok(Event::default().event("change").data(json)),
                    Err(err) => warn!(error = %err, "failed to serialize SSE payload"),
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "SSE client lagged, some events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
