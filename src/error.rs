//! Relay error types with HTTP status code mapping.
//!
//! [`RelayError`] is the central error type. Socket-side failures are
//! logged and answered in-band; HTTP-side failures map to a status code and
//! the flat JSON body described by [`ErrorResponse`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ConnectionId, Role};

/// Structured JSON error body, shared by HTTP responses and socket replies.
///
/// ```json
/// { "error": "invalid event", "details": "timestamp: required field missing" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Short machine-friendly error label.
    pub error: String,
    /// Optional human-readable details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Error without details.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    /// Error with a details string.
    #[must_use]
    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// A controller event failed schema validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{detail}")]
pub struct ValidationError {
    detail: String,
}

impl ValidationError {
    /// Creates a validation error with the given detail.
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    /// Error for a missing required field.
    #[must_use]
    pub fn missing(field: &str) -> Self {
        Self::new(format!("{field}: required field missing"))
    }

    /// Error for a field of the wrong type.
    #[must_use]
    pub fn invalid(field: &str, expected: &str) -> Self {
        Self::new(format!("{field}: expected {expected}"))
    }

    /// Human-readable description of the failure.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// Relay-wide error enum.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Payload failed schema validation.
    #[error("invalid event: {0}")]
    Validation(#[from] ValidationError),

    /// Payload was not valid JSON.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Missing or wrong credential.
    #[error("unauthorized")]
    Unauthorized,

    /// No open connection holds the target role.
    #[error("no {0} connected")]
    RoutingMiss(Role),

    /// Connection failed to answer a liveness probe.
    #[error("stale connection {0}")]
    StaleConnection(ConnectionId),

    /// Connection is not in the registry.
    #[error("connection not found: {0}")]
    ConnectionNotFound(ConnectionId),
}

impl RelayError {
    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::MalformedMessage(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RoutingMiss(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ConnectionNotFound(_) => StatusCode::NOT_FOUND,
            Self::StaleConnection(_) => StatusCode::GONE,
        }
    }

    /// Builds the JSON body for this error.
    #[must_use]
    pub fn to_body(&self) -> ErrorResponse {
        match self {
            Self::Validation(e) => ErrorResponse::with_details("invalid event", e.detail()),
            Self::MalformedMessage(details) => {
                ErrorResponse::with_details("malformed JSON", details.as_str())
            }
            Self::Unauthorized => ErrorResponse::new("unauthorized"),
            other => ErrorResponse::new(other.to_string()),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = axum::Json(self.to_body()).into_response();
        *response.status_mut() = status;
        response
    }
}
