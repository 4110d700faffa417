//! Health endpoint DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::config::RoutingMode;
use crate::domain::Role;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"healthy"` while the process serves requests.
    pub status: String,
    /// RFC 3339 server time.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
    /// Number of open socket connections.
    pub connections: usize,
    /// Active routing mode.
    pub mode: RoutingMode,
    /// Roles currently held by an open connection.
    pub roles: Vec<Role>,
}
