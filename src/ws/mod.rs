//! WebSocket layer: upgrade handling, the per-connection loop, and message
//! shapes.
//!
//! The WebSocket endpoint at `/ws` carries JSON control messages in both
//! directions. Routing decisions live in [`crate::routing`].

pub mod connection;
pub mod handler;
pub mod messages;
