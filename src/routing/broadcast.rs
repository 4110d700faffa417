//! Authenticated broadcast.
//!
//! Validated events from publishers fan out to every other open
//! connection. The `type` field is opaque here.

use std::sync::Arc;

use serde_json::Value;

use super::{RouteOutcome, encode};
use crate::auth::AuthGate;
use crate::domain::{Connection, ConnectionId, ConnectionRegistry, ControllerEvent, Outbound};
use crate::error::RelayError;
use crate::ws::messages::message_type;

/// Publisher-to-everyone policy.
#[derive(Debug)]
pub struct AuthenticatedBroadcast {
    registry: Arc<ConnectionRegistry>,
    gate: Arc<AuthGate>,
}

impl AuthenticatedBroadcast {
    /// Creates the policy over `registry`, checking publishers with `gate`.
    #[must_use]
    pub const fn new(registry: Arc<ConnectionRegistry>, gate: Arc<AuthGate>) -> Self {
        Self { registry, gate }
    }

    /// Routes one socket payload.
    pub async fn on_message(&self, from: &Connection, payload: Value) -> RouteOutcome {
        if !self.gate.may_publish(from) {
            if message_type(&payload) == Some("ping") {
                tracing::debug!(conn_id = %from.id(), "ping from non-publisher");
                return RouteOutcome::Ignored;
            }
            let err = RelayError::Unauthorized;
            tracing::warn!(conn_id = %from.id(), error = %err, "publish from unauthenticated connection");
            let _ = from.send_json(&err.to_body());
            return RouteOutcome::Rejected;
        }

        let event = match ControllerEvent::parse(payload) {
            Ok(event) => event,
            Err(e) => {
                let err = RelayError::from(e);
                tracing::warn!(conn_id = %from.id(), error = %err, "rejecting invalid event");
                let _ = from.send_json(&err.to_body());
                return RouteOutcome::Rejected;
            }
        };

        self.fan_out(&event, Some(from.id())).await
    }

    /// Delivers an HTTP-injected event to every open connection.
    pub async fn inject(&self, event: &ControllerEvent) -> RouteOutcome {
        self.fan_out(event, None).await
    }

    async fn fan_out(&self, event: &ControllerEvent, except: Option<ConnectionId>) -> RouteOutcome {
        let Some(json) = encode(event) else {
            return RouteOutcome::Ignored;
        };

        let mut delivered = 0;
        for conn in self.registry.all_connections().await {
            if Some(conn.id()) == except {
                continue;
            }
            let outcome = conn.try_send(Outbound::Text(json.clone()));
            if outcome.is_delivered() {
                delivered += 1;
            } else {
                tracing::debug!(conn_id = %conn.id(), ?outcome, "broadcast copy dropped");
            }
        }

        tracing::debug!(msg_type = %event.event_type, delivered, "event broadcast");
        RouteOutcome::Forwarded { delivered }
    }
}
