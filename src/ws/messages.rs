//! WebSocket message shapes.
//!
//! Inbound frames are free-form JSON objects; only the in-band `auth`
//! action is recognised before routing. Outbound control replies are the
//! tagged [`ControlMessage`] variants, and errors reuse
//! [`crate::error::ErrorResponse`].

use serde::Serialize;
use serde_json::Value;

use crate::domain::Role;

/// Server → client control reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Role assignment confirmed.
    Identified {
        /// Role now held by the connection.
        role: Role,
    },
    /// In-band authentication succeeded.
    AuthOk,
    /// In-band authentication failed.
    AuthFailed,
}

/// A parsed client frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// `{"action": "auth", "token": "..."}`.
    Auth {
        /// Presented token. Missing or non-string tokens become empty.
        token: String,
    },
    /// Anything else, handed to the routing policy.
    Payload(Value),
}

impl ClientMessage {
    /// Classifies a parsed JSON value.
    #[must_use]
    pub fn classify(value: Value) -> Self {
        if value.get("action").and_then(Value::as_str) == Some("auth") {
            let token = value
                .get("token")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Self::Auth { token };
        }
        Self::Payload(value)
    }
}

/// Value of the `type` field, if it is a string.
#[must_use]
pub fn message_type(value: &Value) -> Option<&str> {
    value.get("type").and_then(Value::as_str)
}
