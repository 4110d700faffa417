//! WebSocket connection loop.
//!
//! Handles the read/write loop for a single socket: inbound frames go to
//! the [`crate::routing::MessageRouter`], queued [`Outbound`] frames go to
//! the peer, and a liveness termination drops the socket.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};

use crate::app_state::AppState;
use crate::domain::{Connection, Outbound};

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Registers the connection, as a publisher if the upgrade request
///   carried a valid credential.
/// - Routes every text or binary frame; pongs refresh liveness.
/// - Unregisters on close, error, or termination.
pub async fn run_connection(socket: WebSocket, state: AppState, publisher: bool) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (conn, mut outbound_rx) = Connection::open(state.outbound_buffer);
    if publisher {
        conn.mark_publisher();
    }
    let conn_id = conn.id();
    state.registry.register(Arc::clone(&conn)).await;
    tracing::info!(%conn_id, publisher, "ws connection opened");

    loop {
        tokio::select! {
            // Incoming frame from the peer
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let outcome = state.router.handle_text(&conn, text.as_str()).await;
                        tracing::trace!(%conn_id, ?outcome, "text frame routed");
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        let outcome = state.router.handle_binary(&conn, &bytes).await;
                        tracing::trace!(%conn_id, ?outcome, "binary frame routed");
                    }
                    Some(Ok(Message::Pong(_))) => conn.mark_alive(),
                    Some(Ok(Message::Ping(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(%conn_id, error = %e, "ws read error");
                        break;
                    }
                }
            }
            // Frame queued by the router or the liveness monitor
            out = outbound_rx.recv() => {
                let frame = match out {
                    Some(Outbound::Text(json)) => Message::text(json),
                    Some(Outbound::Ping) => Message::Ping(Bytes::new()),
                    None => break,
                };
                if ws_tx.send(frame).await.is_err() {
                    break;
                }
            }
            () = conn.terminated() => {
                tracing::debug!(%conn_id, "ws connection terminated");
                break;
            }
        }
    }

    conn.mark_closed();
    let _ = state.registry.unregister(conn_id).await;
    let connected_secs = (Utc::now() - conn.connected_at()).num_seconds();
    tracing::info!(%conn_id, connected_secs, "ws connection closed");
}
