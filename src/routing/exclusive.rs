//! Exclusive role relay.
//!
//! One VR client and one robot. A connection first claims a role with
//! `identify`; afterwards `vr_command` goes to whoever holds `robot` and
//! `robot_status` to whoever holds `vr`. Nothing is queued or retried when
//! the target role is empty.

use std::sync::Arc;

use serde_json::Value;

use super::{RouteOutcome, encode};
use crate::domain::{Connection, ConnectionRegistry, ControllerEvent, Outbound, Role, SendOutcome};
use crate::error::{ErrorResponse, RelayError};
use crate::ws::messages::{ControlMessage, message_type};

/// Role-to-role forwarding policy.
#[derive(Debug)]
pub struct ExclusiveRelay {
    registry: Arc<ConnectionRegistry>,
}

/// Role a message type is addressed to.
#[must_use]
pub fn target_role(message_type: &str) -> Option<Role> {
    match message_type {
        "vr_command" => Some(Role::Robot),
        "robot_status" => Some(Role::Vr),
        _ => None,
    }
}

impl ExclusiveRelay {
    /// Creates the policy over `registry`.
    #[must_use]
    pub const fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Routes one socket payload.
    pub async fn on_message(&self, from: &Connection, payload: Value) -> RouteOutcome {
        let kind = message_type(&payload);
        if kind == Some("identify") {
            return self.identify(from, payload.get("role")).await;
        }

        if from.role().is_none() {
            tracing::warn!(conn_id = %from.id(), msg_type = ?kind, "message before identify; ignoring");
            return RouteOutcome::Ignored;
        }

        let Some(target) = kind.and_then(target_role) else {
            tracing::warn!(conn_id = %from.id(), msg_type = ?kind, "unknown message type");
            return RouteOutcome::Ignored;
        };

        match encode(&payload) {
            Some(json) => self.forward(target, json).await,
            None => RouteOutcome::Ignored,
        }
    }

    /// Routes an HTTP-injected event by its type.
    pub async fn inject(&self, event: &ControllerEvent) -> RouteOutcome {
        let Some(target) = target_role(&event.event_type) else {
            tracing::warn!(msg_type = %event.event_type, "injected event has no target role; dropping");
            return RouteOutcome::Dropped;
        };
        match encode(event) {
            Some(json) => self.forward(target, json).await,
            None => RouteOutcome::Ignored,
        }
    }

    async fn identify(&self, from: &Connection, requested: Option<&Value>) -> RouteOutcome {
        let raw = requested.and_then(Value::as_str).unwrap_or_default();
        let role = match raw.parse::<Role>() {
            Ok(role) => role,
            Err(e) => {
                tracing::warn!(conn_id = %from.id(), role = ?requested, "unknown role");
                let _ = from.send_json(&ErrorResponse::with_details("unknown role", e.to_string()));
                return RouteOutcome::Rejected;
            }
        };

        match self.registry.set_role(from, role).await {
            Ok(evicted) => {
                if let Some(previous) = evicted {
                    tracing::info!(conn_id = %from.id(), %role, evicted = %previous, "role taken over");
                } else {
                    tracing::info!(conn_id = %from.id(), %role, "connection identified");
                }
                let _ = from.send_json(&ControlMessage::Identified { role });
                RouteOutcome::Replied
            }
            Err(e) => {
                tracing::warn!(conn_id = %from.id(), error = %e, "identify from unregistered connection");
                RouteOutcome::Ignored
            }
        }
    }

    async fn forward(&self, target: Role, json: String) -> RouteOutcome {
        let Some(holder) = self.registry.current_holder(target).await else {
            let miss = RelayError::RoutingMiss(target);
            tracing::warn!(error = %miss, "dropping message");
            return RouteOutcome::Dropped;
        };
        match holder.try_send(Outbound::Text(json)) {
            SendOutcome::Delivered => RouteOutcome::Forwarded { delivered: 1 },
            SendOutcome::Dropped(reason) => {
                tracing::warn!(conn_id = %holder.id(), role = %target, ?reason, "send to role holder dropped");
                RouteOutcome::Dropped
            }
        }
    }
}
