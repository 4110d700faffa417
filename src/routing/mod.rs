//! Message routing: decides which connections receive a message.
//!
//! [`MessageRouter`] is the single entry point for socket frames and HTTP
//! ingress. It handles the in-band `auth` action itself and hands
//! everything else to the policy selected by [`RoutingMode`]:
//!
//! - [`ExclusiveRelay`]: `vr_command` → robot, `robot_status` → VR.
//! - [`AuthenticatedBroadcast`]: publisher → every other connection.
//!
//! Routing never writes to a socket. Targets receive a freshly serialized
//! copy through [`crate::domain::Connection::try_send`], so a slow peer
//! can only lose its own messages.

pub mod broadcast;
pub mod exclusive;

use std::sync::Arc;

use serde_json::Value;

pub use broadcast::AuthenticatedBroadcast;
pub use exclusive::ExclusiveRelay;

use crate::auth::AuthGate;
use crate::config::RoutingMode;
use crate::domain::{Connection, ConnectionRegistry, ControllerEvent};
use crate::error::RelayError;
use crate::ws::messages::{ClientMessage, ControlMessage};

/// What happened to a routed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Relayed to `delivered` connections.
    Forwarded {
        /// Number of connections the copy was queued for.
        delivered: usize,
    },
    /// Answered on the sender's own connection only.
    Replied,
    /// Refused with an error reply to the sender.
    Rejected,
    /// No eligible target; dropped without telling the sender.
    Dropped,
    /// Malformed, unknown, or premature; logged and ignored.
    Ignored,
}

#[derive(Debug)]
enum Policy {
    Exclusive(ExclusiveRelay),
    Broadcast(AuthenticatedBroadcast),
}

/// Routes socket messages and injected events.
#[derive(Debug)]
pub struct MessageRouter {
    policy: Policy,
    gate: Arc<AuthGate>,
}

impl MessageRouter {
    /// Creates a router with the policy for `mode`.
    #[must_use]
    pub fn new(mode: RoutingMode, registry: Arc<ConnectionRegistry>, gate: Arc<AuthGate>) -> Self {
        let policy = match mode {
            RoutingMode::Exclusive => Policy::Exclusive(ExclusiveRelay::new(registry)),
            RoutingMode::Broadcast => {
                Policy::Broadcast(AuthenticatedBroadcast::new(registry, Arc::clone(&gate)))
            }
        };
        Self { policy, gate }
    }

    /// Active routing mode.
    #[must_use]
    pub const fn mode(&self) -> RoutingMode {
        match self.policy {
            Policy::Exclusive(_) => RoutingMode::Exclusive,
            Policy::Broadcast(_) => RoutingMode::Broadcast,
        }
    }

    /// Handles one text frame from `from`.
    pub async fn handle_text(&self, from: &Connection, raw: &str) -> RouteOutcome {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                let err = RelayError::MalformedMessage(e.to_string());
                tracing::warn!(conn_id = %from.id(), error = %err, "ignoring non-JSON message");
                return RouteOutcome::Ignored;
            }
        };

        match ClientMessage::classify(value) {
            ClientMessage::Auth { token } => self.authenticate(from, &token),
            ClientMessage::Payload(payload) => match &self.policy {
                Policy::Exclusive(relay) => relay.on_message(from, payload).await,
                Policy::Broadcast(broadcast) => broadcast.on_message(from, payload).await,
            },
        }
    }

    /// Handles one binary frame. UTF-8 JSON is routed like text.
    pub async fn handle_binary(&self, from: &Connection, bytes: &[u8]) -> RouteOutcome {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.handle_text(from, text).await,
            Err(_) => {
                tracing::warn!(conn_id = %from.id(), len = bytes.len(), "ignoring non-UTF-8 binary message");
                RouteOutcome::Ignored
            }
        }
    }

    /// Routes an event that arrived through an authenticated HTTP request.
    pub async fn inject(&self, event: &ControllerEvent) -> RouteOutcome {
        match &self.policy {
            Policy::Exclusive(relay) => relay.inject(event).await,
            Policy::Broadcast(broadcast) => broadcast.inject(event).await,
        }
    }

    fn authenticate(&self, from: &Connection, token: &str) -> RouteOutcome {
        let reply = if self.gate.try_inband_auth(from, token) {
            tracing::info!(conn_id = %from.id(), "connection authenticated as publisher");
            ControlMessage::AuthOk
        } else {
            tracing::warn!(conn_id = %from.id(), "in-band authentication failed");
            ControlMessage::AuthFailed
        };
        let _ = from.send_json(&reply);
        RouteOutcome::Replied
    }
}

/// Serializes a routed payload, logging instead of failing.
fn encode<T: serde::Serialize>(payload: &T) -> Option<String> {
    match serde_json::to_string(payload) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::warn!(error = %e, "failed to re-serialize routed message");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use serde_json::Value;
    use tokio::sync::mpsc;

    use crate::domain::{Connection, ConnectionRegistry, Outbound};

    /// Registered connection plus the receiving end of its queue.
    pub(crate) struct Peer {
        pub(crate) conn: Arc<Connection>,
        pub(crate) rx: mpsc::Receiver<Outbound>,
    }

    impl Peer {
        pub(crate) async fn join(registry: &ConnectionRegistry) -> Self {
            let (conn, rx) = Connection::open(16);
            registry.register(Arc::clone(&conn)).await;
            Self { conn, rx }
        }

        /// Next queued text frame parsed as JSON, if any.
        pub(crate) fn next_json(&mut self) -> Option<Value> {
            match self.rx.try_recv() {
                Ok(Outbound::Text(text)) => serde_json::from_str(&text).ok(),
                _ => None,
            }
        }

        /// Next queued text frame verbatim, if any.
        pub(crate) fn next_text(&mut self) -> Option<String> {
            match self.rx.try_recv() {
                Ok(Outbound::Text(text)) => Some(text),
                _ => None,
            }
        }

        pub(crate) fn is_silent(&mut self) -> bool {
            self.rx.try_recv().is_err()
        }
    }
}
