//! # controller-relay
//!
//! WebSocket relay for real-time controller events.
//!
//! Clients connect over a WebSocket and exchange JSON control messages.
//! In the default exclusive mode one VR client and one robot identify
//! themselves and the relay forwards `vr_command` to the robot and
//! `robot_status` back to the VR client. In broadcast mode, events from
//! authenticated publishers go to every other connection. An HTTP publish
//! endpoint injects events as an authenticated publisher.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── HTTP Handlers (api/)        ── AuthGate (auth)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── MessageRouter (routing/)    ── ControllerEvent validator
//!     │     ├── ExclusiveRelay
//!     │     └── AuthenticatedBroadcast
//!     │
//!     ├── ConnectionRegistry (domain/)
//!     └── LivenessMonitor (liveness)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod liveness;
pub mod routing;
pub mod server;
pub mod ws;
