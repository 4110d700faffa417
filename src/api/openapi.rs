//! OpenAPI document for the HTTP endpoints.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::dto::{HealthResponse, PublishRequest, PublishResponse};
use super::handlers::{publish, system};
use crate::config::RoutingMode;
use crate::domain::Role;
use crate::error::ErrorResponse;

/// Generated OpenAPI specification.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "controller-relay", description = "WebSocket relay for controller events"),
    paths(system::ping_handler, system::health_handler, publish::publish_event),
    components(schemas(
        HealthResponse,
        PublishRequest,
        PublishResponse,
        ErrorResponse,
        RoutingMode,
        Role
    )),
    modifiers(&BearerSecurity),
    tags(
        (name = "System", description = "Liveness and health"),
        (name = "Publish", description = "HTTP ingress into the relay"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme used by `POST /publish`.
#[derive(Debug)]
struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}
