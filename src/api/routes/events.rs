//! Event Stream Route
//!
//! GET /events - Server-sent event stream of new messages
//!
//! Each request joins the subscriber registry and gets its own stream
//! session task. The task ends, and the subscriber is unregistered, when the
//! client disconnects, the dispatcher evicts it, or the server shuts down.

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::AuthUser;
use crate::api::state::AppState;
use crate::broadcast::{BroadcastError, StreamSession};

/// GET /events
pub async fn stream_events(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Response> {
    let broadcast = &state.config.broadcast;

    let (session, body) =
        StreamSession::open(state.subscribers(), user_id, broadcast.outbound_buffer).map_err(
            |e| match e {
                BroadcastError::TooManySubscribers { .. } => {
                    tracing::warn!(user_id, error = %e, "Rejecting event stream");
                    ApiError::ServiceUnavailable(e.to_string())
                }
            },
        )?;

    tokio::spawn(
        session
            .keep_alive(broadcast.keep_alive())
            .until_shutdown(state.shutdown_receiver())
            .run(),
    );
    tracing::info!(user_id, "Event stream opened");

    let stream = ReceiverStream::new(body).map(Ok::<_, Infallible>);

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
