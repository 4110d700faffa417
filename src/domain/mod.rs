//! Domain layer: connection identity, roles, the connection registry and
//! the controller event schema.
//!
//! This module holds the state shared by every socket task: the
//! [`ConnectionRegistry`] tracking live connections and role slots, the
//! [`Connection`] handle each task owns a share of, and the
//! [`ControllerEvent`] validator applied to published payloads.

pub mod connection;
pub mod connection_id;
pub mod event;
pub mod registry;
pub mod role;

pub use connection::{Connection, DropReason, Outbound, SendOutcome};
pub use connection_id::ConnectionId;
pub use event::{ControllerEvent, ControllerId, Timestamp};
pub use registry::ConnectionRegistry;
pub use role::Role;
