//! Liveness monitor: pings every connection and reaps the silent ones.
//!
//! Each tick a connection whose flag is still set from its last pong gets
//! the flag cleared and a fresh ping. A connection whose flag is already
//! clear missed the previous ping and is terminated and unregistered.
//! Probes go through the outbound queue with `try_send`, so a stuck peer
//! cannot stall the sweep. A probe dropped because the queue is full still
//! clears the flag: a peer that has not drained its queue for a whole
//! period counts as having missed the probe.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::domain::{ConnectionRegistry, Outbound};
use crate::error::RelayError;

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Connections sent a new probe.
    pub probed: usize,
    /// Connections whose probe could not be queued.
    pub dropped: usize,
    /// Connections terminated for missing the previous probe.
    pub terminated: usize,
}

/// Periodic ping/terminate loop over the registry.
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    registry: Arc<ConnectionRegistry>,
    period: Duration,
}

impl LivenessMonitor {
    /// Creates a monitor that sweeps every `period`.
    #[must_use]
    pub const fn new(registry: Arc<ConnectionRegistry>, period: Duration) -> Self {
        Self { registry, period }
    }

    /// Probe period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Runs one probe/terminate pass.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        for conn in self.registry.all_connections().await {
            if conn.take_alive() {
                let outcome = conn.try_send(Outbound::Ping);
                if outcome.is_delivered() {
                    report.probed += 1;
                } else {
                    tracing::debug!(conn_id = %conn.id(), ?outcome, "liveness probe dropped");
                    report.dropped += 1;
                }
            } else {
                let stale = RelayError::StaleConnection(conn.id());
                tracing::info!(error = %stale, "terminating stale connection");
                conn.terminate();
                let _ = self.registry.unregister(conn.id()).await;
                report.terminated += 1;
            }
        }
        report
    }

    /// Sweeps forever, first one full period after the call.
    pub async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let report = self.sweep().await;
            tracing::debug!(
                probed = report.probed,
                dropped = report.dropped,
                terminated = report.terminated,
                "liveness sweep"
            );
        }
    }

    /// Spawns [`LivenessMonitor::run`] on the current runtime.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Connection, Role};

    async fn monitor_with_conn(
        capacity: usize,
    ) -> (
        LivenessMonitor,
        Arc<Connection>,
        tokio::sync::mpsc::Receiver<Outbound>,
    ) {
        let registry = Arc::new(ConnectionRegistry::new());
        let (conn, rx) = Connection::open(capacity);
        registry.register(Arc::clone(&conn)).await;
        (
            LivenessMonitor::new(registry, Duration::from_secs(30)),
            conn,
            rx,
        )
    }

    #[tokio::test]
    async fn silent_connection_dies_after_one_missed_probe() {
        let (monitor, conn, mut rx) = monitor_with_conn(4).await;

        let first = monitor.sweep().await;
        assert_eq!(first, SweepReport { probed: 1, dropped: 0, terminated: 0 });
        assert_eq!(rx.try_recv().ok(), Some(Outbound::Ping));
        assert!(conn.is_open());

        let second = monitor.sweep().await;
        assert_eq!(second, SweepReport { probed: 0, dropped: 0, terminated: 1 });
        assert!(!conn.is_open());
        assert!(monitor.registry.is_empty().await);
    }

    #[tokio::test]
    async fn answering_connection_is_never_terminated() {
        let (monitor, conn, mut rx) = monitor_with_conn(4).await;
        for _ in 0..5 {
            let report = monitor.sweep().await;
            assert_eq!(report.terminated, 0);
            assert_eq!(rx.try_recv().ok(), Some(Outbound::Ping));
            conn.mark_alive();
        }
        assert!(conn.is_open());
        assert_eq!(monitor.registry.len().await, 1);
    }

    #[tokio::test]
    async fn termination_clears_role_slot() {
        let (monitor, conn, _rx) = monitor_with_conn(4).await;
        let _ = monitor.registry.set_role(&conn, Role::Robot).await;

        let _ = monitor.sweep().await;
        let _ = monitor.sweep().await;
        assert!(monitor.registry.current_holder(Role::Robot).await.is_none());
    }

    #[tokio::test]
    async fn full_queue_does_not_block_sweep() {
        let (monitor, conn, _rx) = monitor_with_conn(1).await;
        assert!(conn.try_send(Outbound::Text("backlog".to_string())).is_delivered());

        let report = tokio::time::timeout(Duration::from_secs(1), monitor.sweep()).await;
        assert_eq!(report.ok(), Some(SweepReport { probed: 0, dropped: 1, terminated: 0 }));
    }

    #[tokio::test]
    async fn dropped_probe_counts_as_missed() {
        let (monitor, conn, mut rx) = monitor_with_conn(1).await;
        assert!(conn.try_send(Outbound::Text("backlog".to_string())).is_delivered());

        let first = monitor.sweep().await;
        assert_eq!(first, SweepReport { probed: 0, dropped: 1, terminated: 0 });
        assert_eq!(rx.try_recv().ok(), Some(Outbound::Text("backlog".to_string())));
        assert!(rx.try_recv().is_err());

        let second = monitor.sweep().await;
        assert_eq!(second, SweepReport { probed: 0, dropped: 0, terminated: 1 });
        assert!(!conn.is_open());
    }

    #[tokio::test]
    async fn spawned_monitor_reaps_silent_connection() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (conn, _rx) = Connection::open(4);
        registry.register(Arc::clone(&conn)).await;

        let handle =
            LivenessMonitor::new(Arc::clone(&registry), Duration::from_millis(20)).spawn();
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        assert!(!conn.is_open());
        assert!(registry.is_empty().await);
    }
}
