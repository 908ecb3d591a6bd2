//! # Live Event Stream (SSE)
//!
//! `GET /api/events/requests` — long-lived text/event-stream carrying
//! `requestUpdate` and `statusChange` events to every connected client.
//!
//! The token is accepted from the `Authorization` header or the `token`
//! query parameter, because `EventSource` cannot set request headers.
//!
//! Connection lifecycle: an immediate `connected` acknowledgment, then
//! events in publish order, with a comment-only heartbeat on the
//! configured keep-alive interval so intermediaries do not idle the
//! connection out. A client that falls behind the broadcast buffer skips
//! the missed events and keeps receiving fresh ones — the entity store is
//! ground truth, and clients reconcile by re-fetching. Dropping the
//! connection drops the subscription; there is nothing to clean up
//! server-side.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures::Stream;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

use crate::auth::AuthUser;
use crate::state::AppState;

/// Build the events router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/events/requests", get(request_events))
}

/// GET /api/events/requests — Subscribe to live request updates.
#[utoipa::path(
    get,
    path = "/api/events/requests",
    responses(
        (status = 200, description = "text/event-stream of requestUpdate/statusChange events"),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
    ),
    tag = "events"
)]
async fn request_events(
    user: AuthUser,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.events.subscribe();
    tracing::info!(
        username = %user.username,
        subscribers = state.events.subscriber_count(),
        "sse subscriber connected"
    );

    let username = user.username;
    let stream = async_stream::stream! {
        // Immediate acknowledgment so the client knows the stream is live
        // before the first real event arrives.
        yield Ok(Event::default().data(
            json!({"type": "connected", "message": "SSE connection established"}).to_string(),
        ));

        loop {
            match rx.recv().await {
                Ok(envelope) => {
                    yield Ok(Event::default()
                        .id(envelope.event_id.to_string())
                        .event(envelope.kind)
                        .data(envelope.data.to_string()));
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(
                        username = %username,
                        missed,
                        "sse subscriber lagged; skipping missed events"
                    );
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::info!(username = %username, "sse subscriber stream ended");
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(state.config.keepalive)
            .text("heartbeat"),
    )
}
