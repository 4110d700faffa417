//! Shared-secret authentication for publishers.
//!
//! The gate fails closed: with no secret configured nothing authenticates.
//! Credentials arrive either as an `Authorization: Bearer` header (HTTP
//! publish, WebSocket upgrade) or as an in-band `auth` message on an open
//! socket.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use subtle::ConstantTimeEq;

use crate::config::RelayConfig;
use crate::domain::Connection;

/// Authentication gate for publish actions.
#[derive(Clone, Default)]
pub struct AuthGate {
    secret: Option<String>,
    waive_socket_auth: bool,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("configured", &self.secret.is_some())
            .field("waive_socket_auth", &self.waive_socket_auth)
            .finish()
    }
}

impl AuthGate {
    /// Creates a gate. An empty secret counts as no secret.
    #[must_use]
    pub fn new(secret: Option<String>, waive_socket_auth: bool) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
            waive_socket_auth,
        }
    }

    /// Creates a gate from the relay configuration.
    #[must_use]
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            config.shared_secret.clone(),
            config.allow_unauthenticated_ws,
        )
    }

    /// Returns `true` if a secret is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Checks an `Authorization` header value.
    ///
    /// True only if a secret is configured, the scheme is `Bearer`, and the
    /// credential matches exactly.
    #[must_use]
    pub fn is_authed_request(&self, authorization: Option<&str>) -> bool {
        let Some(value) = authorization else {
            return false;
        };
        let Some((scheme, credential)) = value.trim().split_once(' ') else {
            return false;
        };
        scheme.eq_ignore_ascii_case("bearer") && self.matches(credential.trim_start())
    }

    /// Checks the `Authorization` header of a request.
    #[must_use]
    pub fn is_authed_headers(&self, headers: &HeaderMap) -> bool {
        self.is_authed_request(headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()))
    }

    /// Authenticates a socket with an in-band token.
    ///
    /// On success the connection becomes a publisher for the rest of its
    /// life. On failure its publisher flag is left as it was.
    pub fn try_inband_auth(&self, conn: &Connection, token: &str) -> bool {
        if self.matches(token) {
            conn.mark_publisher();
            true
        } else {
            false
        }
    }

    /// Whether socket publishing skips the publisher check.
    #[must_use]
    pub const fn socket_auth_waived(&self) -> bool {
        self.waive_socket_auth
    }

    /// Whether `conn` may publish over its socket.
    #[must_use]
    pub fn may_publish(&self, conn: &Connection) -> bool {
        self.waive_socket_auth || conn.is_publisher()
    }

    fn matches(&self, presented: &str) -> bool {
        self.secret
            .as_deref()
            .is_some_and(|secret| bool::from(secret.as_bytes().ct_eq(presented.as_bytes())))
    }
}
