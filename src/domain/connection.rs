//! Live connection handle shared between the socket task, the registry,
//! the router and the liveness monitor.
//!
//! A [`Connection`] never touches the socket itself. Everything addressed
//! to the peer goes through a bounded queue drained by the connection's own
//! task, so a send from anywhere else is a non-blocking `try_send` that
//! either lands in the queue or is dropped.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Notify, mpsc};

use super::{ConnectionId, Role};

/// Frame queued for delivery to a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Serialized JSON text message.
    Text(String),
    /// Liveness probe (WebSocket ping frame).
    Ping,
}

/// Why a send did not reach the outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The connection is closed or closing.
    Closed,
    /// The peer is not draining its queue fast enough.
    Full,
    /// The payload could not be serialized.
    Unencodable,
}

/// Result of a best-effort send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The frame was queued for the socket task.
    Delivered,
    /// The frame was discarded.
    Dropped(DropReason),
}

impl SendOutcome {
    /// Returns `true` if the frame was queued.
    #[must_use]
    pub const fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

const NO_ROLE: u8 = 0;

/// One accepted WebSocket connection.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    tx: mpsc::Sender<Outbound>,
    alive: AtomicBool,
    publisher: AtomicBool,
    role: AtomicU8,
    closed: AtomicBool,
    kill: Notify,
    connected_at: DateTime<Utc>,
}

impl Connection {
    /// Creates a connection with an outbound queue of `capacity` frames.
    ///
    /// Returns the shared handle and the receiving half that the socket
    /// task drains. A zero capacity is raised to one.
    #[must_use]
    pub fn open(capacity: usize) -> (Arc<Self>, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let conn = Self {
            id: ConnectionId::new(),
            tx,
            alive: AtomicBool::new(true),
            publisher: AtomicBool::new(false),
            role: AtomicU8::new(NO_ROLE),
            closed: AtomicBool::new(false),
            kill: Notify::new(),
            connected_at: Utc::now(),
        };
        (Arc::new(conn), rx)
    }

    /// Connection identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// When the socket was accepted.
    #[must_use]
    pub const fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Returns `true` until the connection is terminated, closed by its
    /// task, or its outbound queue has lost its receiver.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    /// Role tag last assigned to this connection.
    ///
    /// The tag is not cleared when another connection takes the slot over;
    /// ask the registry for the current holder instead.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        Role::from_tag(self.role.load(Ordering::Acquire))
    }

    pub(crate) fn set_role_tag(&self, role: Option<Role>) {
        self.role
            .store(role.map_or(NO_ROLE, Role::to_tag), Ordering::Release);
    }

    /// Whether this connection may publish.
    #[must_use]
    pub fn is_publisher(&self) -> bool {
        self.publisher.load(Ordering::Acquire)
    }

    /// Marks the connection as an authenticated publisher.
    pub fn mark_publisher(&self) {
        self.publisher.store(true, Ordering::Release);
    }

    /// Records a probe response.
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Release);
    }

    /// Clears the liveness flag, returning whether it was set.
    pub(crate) fn take_alive(&self) -> bool {
        self.alive.swap(false, Ordering::AcqRel)
    }

    /// Queues a frame without waiting.
    ///
    /// Checks that the connection is open right before queueing. A close
    /// racing this call can still drop the frame.
    pub fn try_send(&self, frame: Outbound) -> SendOutcome {
        if !self.is_open() {
            return SendOutcome::Dropped(DropReason::Closed);
        }
        match self.tx.try_send(frame) {
            Ok(()) => SendOutcome::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => SendOutcome::Dropped(DropReason::Full),
            Err(mpsc::error::TrySendError::Closed(_)) => SendOutcome::Dropped(DropReason::Closed),
        }
    }

    /// Serializes `message` to JSON and queues it as a text frame.
    pub fn send_json<T: Serialize>(&self, message: &T) -> SendOutcome {
        match serde_json::to_string(message) {
            Ok(json) => self.try_send(Outbound::Text(json)),
            Err(e) => {
                tracing::warn!(conn_id = %self.id, error = %e, "failed to encode outbound message");
                SendOutcome::Dropped(DropReason::Unencodable)
            }
        }
    }

    /// Forcibly closes the connection. The socket task observes this via
    /// [`Connection::terminated`] and drops the socket.
    pub fn terminate(&self) {
        self.closed.store(true, Ordering::Release);
        self.kill.notify_one();
    }

    /// Marks the connection closed after its task has finished.
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Resolves once [`Connection::terminate`] has been called.
    pub async fn terminated(&self) {
        self.kill.notified().await;
    }
}
