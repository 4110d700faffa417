//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::AuthGate;
use crate::config::RelayConfig;
use crate::domain::ConnectionRegistry;
use crate::routing::MessageRouter;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live connections and role slots.
    pub registry: Arc<ConnectionRegistry>,
    /// Publisher authentication.
    pub auth: Arc<AuthGate>,
    /// Message routing policy.
    pub router: Arc<MessageRouter>,
    /// Per-connection outbound queue depth.
    pub outbound_buffer: usize,
}

impl AppState {
    /// Builds the registry, gate and router described by `config`.
    #[must_use]
    pub fn from_config(config: &RelayConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let auth = Arc::new(AuthGate::from_config(config));
        let router = Arc::new(MessageRouter::new(
            config.routing_mode,
            Arc::clone(&registry),
            Arc::clone(&auth),
        ));
        Self {
            registry,
            auth,
            router,
            outbound_buffer: config.outbound_buffer,
        }
    }
}
