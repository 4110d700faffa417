//! HTTP publish endpoint: injects an event into the router.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{PublishRequest, PublishResponse};
use crate::app_state::AppState;
use crate::domain::ControllerEvent;
use crate::error::{ErrorResponse, RelayError};

/// `POST /publish` — Forward a controller event to socket clients.
///
/// The bearer credential is checked before the body is looked at. The
/// response is sent once copies are queued, not after delivery.
///
/// # Errors
///
/// Returns [`RelayError::Unauthorized`] without a valid bearer credential,
/// and [`RelayError::MalformedMessage`] or [`RelayError::Validation`] for a
/// bad body.
#[utoipa::path(
    post,
    path = "/publish",
    tag = "Publish",
    summary = "Publish a controller event",
    description = "Validates the body as a controller event and forwards it as if sent by an authenticated publisher. Unknown fields pass through unchanged.",
    request_body = PublishRequest,
    security(("bearer" = [])),
    responses(
        (status = 202, description = "Event forwarded", body = PublishResponse),
        (status = 400, description = "Malformed or invalid event", body = ErrorResponse),
        (status = 401, description = "Missing or wrong bearer credential", body = ErrorResponse),
    )
)]
pub async fn publish_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, RelayError> {
    if !state.auth.is_authed_headers(&headers) {
        tracing::warn!("publish rejected: bad or missing credential");
        return Err(RelayError::Unauthorized);
    }

    let event = ControllerEvent::from_slice(&body).inspect_err(|e| {
        tracing::warn!(error = %e, "publish rejected: invalid body");
    })?;

    let outcome = state.router.inject(&event).await;
    tracing::info!(msg_type = %event.event_type, ?outcome, "event published over http");

    Ok((
        StatusCode::ACCEPTED,
        Json(PublishResponse {
            status: "forwarded".to_string(),
            ts: Utc::now().timestamp_millis(),
        }),
    ))
}

/// Publish routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/publish", post(publish_event))
}
