//! Publish endpoint DTOs.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use utoipa::openapi::schema::{ObjectBuilder, OneOfBuilder, Schema, Type};
use utoipa::openapi::RefOr;

/// Request body for `POST /publish`.
///
/// Schema only. The handler validates the raw body with
/// [`crate::domain::ControllerEvent::parse`], so fields not listed here are
/// accepted and forwarded unchanged.
#[derive(Debug, ToSchema)]
pub struct PublishRequest {
    /// Event type. Defaults to `xbox_input`.
    #[schema(rename = "type", example = "xbox_input")]
    pub event_type: Option<String>,
    /// Event time; a number or a string holding a finite number.
    #[schema(schema_with = number_or_string)]
    pub timestamp: Value,
    /// Controller identifier; a string or a number.
    #[schema(schema_with = number_or_string)]
    pub controller_id: Option<Value>,
    /// Axis name → value.
    pub axes: Option<HashMap<String, f64>>,
    /// Button name → value.
    pub buttons: Option<HashMap<String, f64>>,
}

fn number_or_string() -> RefOr<Schema> {
    Schema::OneOf(
        OneOfBuilder::new()
            .item(ObjectBuilder::new().schema_type(Type::Number))
            .item(ObjectBuilder::new().schema_type(Type::String))
            .build(),
    )
    .into()
}

/// Response body for an accepted publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PublishResponse {
    /// Always `"forwarded"`.
    pub status: String,
    /// Server time of acceptance, epoch milliseconds.
    pub ts: i64,
}
