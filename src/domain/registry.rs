//! Concurrent connection storage with exclusive role slots.
//!
//! [`ConnectionRegistry`] keeps every live connection plus the two role
//! slots under a single [`tokio::sync::RwLock`]. Holding one lock for both
//! means a removal and the slot clear that goes with it are atomic, and two
//! racing `identify` messages for the same role serialize cleanly.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{Connection, ConnectionId, Role};
use crate::error::RelayError;

#[derive(Debug, Default)]
struct RoleSlots {
    vr: Option<ConnectionId>,
    robot: Option<ConnectionId>,
}

impl RoleSlots {
    fn slot_mut(&mut self, role: Role) -> &mut Option<ConnectionId> {
        match role {
            Role::Vr => &mut self.vr,
            Role::Robot => &mut self.robot,
        }
    }

    const fn get(&self, role: Role) -> Option<ConnectionId> {
        match role {
            Role::Vr => self.vr,
            Role::Robot => self.robot,
        }
    }

    /// Clears every slot naming `id`, returning the role it held.
    fn clear_if_holds(&mut self, id: ConnectionId) -> Option<Role> {
        let mut cleared = None;
        for role in [Role::Vr, Role::Robot] {
            let slot = self.slot_mut(role);
            if *slot == Some(id) {
                *slot = None;
                cleared = Some(role);
            }
        }
        cleared
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, Arc<Connection>>,
    slots: RoleSlots,
}

/// Central store for all live connections.
///
/// # Concurrency
///
/// - Lookups take the read lock and may run concurrently.
/// - Every mutation, including the role slot check-then-act, takes the
///   write lock.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    state: RwLock<RegistryState>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection. No role is assigned.
    pub async fn register(&self, conn: Arc<Connection>) {
        let mut state = self.state.write().await;
        state.connections.insert(conn.id(), conn);
    }

    /// Removes a connection and clears any role slot pointing at it.
    ///
    /// Returns the removed connection, or `None` if it was already gone.
    pub async fn unregister(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        let mut state = self.state.write().await;
        let removed = state.connections.remove(&id);
        if let Some(role) = state.slots.clear_if_holds(id) {
            tracing::info!(conn_id = %id, %role, "role holder disconnected");
        }
        removed
    }

    /// Clears any role slot held by `id` without removing the connection.
    pub async fn clear_if_holds(&self, id: ConnectionId) -> Option<Role> {
        self.state.write().await.slots.clear_if_holds(id)
    }

    /// Makes `conn` the holder of `role`, last writer wins.
    ///
    /// Returns the id of the evicted holder, if any. The evicted connection
    /// is left open and is not told. A connection switching roles gives up
    /// its previous slot.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ConnectionNotFound`] if `conn` is not
    /// registered.
    pub async fn set_role(
        &self,
        conn: &Connection,
        role: Role,
    ) -> Result<Option<ConnectionId>, RelayError> {
        let id = conn.id();
        let mut state = self.state.write().await;
        if !state.connections.contains_key(&id) {
            return Err(RelayError::ConnectionNotFound(id));
        }
        state.slots.clear_if_holds(id);
        let evicted = state.slots.slot_mut(role).replace(id);
        conn.set_role_tag(Some(role));
        Ok(evicted.filter(|prev| *prev != id))
    }

    /// Returns the current holder of `role` if it is still open.
    pub async fn current_holder(&self, role: Role) -> Option<Arc<Connection>> {
        let state = self.state.read().await;
        let id = state.slots.get(role)?;
        state
            .connections
            .get(&id)
            .filter(|conn| conn.is_open())
            .cloned()
    }

    /// Looks up a connection by id.
    pub async fn get(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.state.read().await.connections.get(&id).cloned()
    }

    /// Snapshot of every registered connection.
    pub async fn all_connections(&self) -> Vec<Arc<Connection>> {
        self.state
            .read()
            .await
            .connections
            .values()
            .cloned()
            .collect()
    }

    /// Number of registered connections.
    pub async fn len(&self) -> usize {
        self.state.read().await.connections.len()
    }

    /// Returns `true` if no connection is registered.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.connections.is_empty()
    }

    /// Number of registered connections that are still open.
    pub async fn open_count(&self) -> usize {
        self.state
            .read()
            .await
            .connections
            .values()
            .filter(|conn| conn.is_open())
            .count()
    }

    /// Roles currently held by an open connection.
    pub async fn occupied_roles(&self) -> Vec<Role> {
        let state = self.state.read().await;
        [Role::Vr, Role::Robot]
            .into_iter()
            .filter(|role| {
                state
                    .slots
                    .get(*role)
                    .and_then(|id| state.connections.get(&id))
                    .is_some_and(|conn| conn.is_open())
            })
            .collect()
    }
}
