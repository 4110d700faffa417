//! Data Transfer Objects for REST request/response serialization.

pub mod publish_dto;
pub mod system_dto;

pub use publish_dto::*;
pub use system_dto::*;
