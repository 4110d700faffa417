//! Axum WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::HeaderMap;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;

/// `GET /ws` — Upgrade HTTP connection to WebSocket.
///
/// A valid `Authorization: Bearer` header on the upgrade request makes the
/// connection a publisher from the start.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let publisher = state.auth.is_authed_headers(&headers);
    ws.on_upgrade(move |socket| run_connection(socket, state, publisher))
}
