//! System endpoints: plain-text ping and JSON health.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::HealthResponse;
use crate::app_state::AppState;

/// `GET /ping` — Fixed-body liveness check for hosting platforms.
#[utoipa::path(
    get,
    path = "/ping",
    tag = "System",
    summary = "Ping",
    description = "Returns `pong` with status 200 while the process is up.",
    responses(
        (status = 200, description = "Process is up", body = String, content_type = "text/plain"),
    )
)]
pub async fn ping_handler() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health, version, current timestamp, open connection count, routing mode and occupied roles.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            connections: state.registry.open_count().await,
            mode: state.router.mode(),
            roles: state.registry.occupied_roles().await,
        }),
    )
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping_handler))
        .route("/health", get(health_handler))
}
