//! Connectivity state machine and reconnect bridge.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::processor::SyncProcessor;

/// Observed connectivity transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkTransition {
    WentOnline,
    WentOffline,
    Unchanged,
}

/// Two-state connectivity tracker.
///
/// Fed by the platform's reachability callbacks through
/// `report_reachable`; read synchronously by the UI and the processor's
/// drain guard, or watched as a stream by the reconnect bridge.
pub struct NetworkMonitor {
    online: watch::Sender<bool>,
}

impl NetworkMonitor {
    /// Create a monitor with the given initial state.
    pub fn new(initially_online: bool) -> Self {
        let (online, _) = watch::channel(initially_online);
        Self { online }
    }

    /// Current state, for UI reads and the processor's guard check.
    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Feed a reachability report from the status provider.
    pub fn report_reachable(&self, reachable: bool) -> NetworkTransition {
        let previous = self.online.send_replace(reachable);
        match (previous, reachable) {
            (false, true) => {
                info!("connectivity restored");
                NetworkTransition::WentOnline
            }
            (true, false) => {
                warn!("connectivity lost");
                NetworkTransition::WentOffline
            }
            _ => NetworkTransition::Unchanged,
        }
    }

    /// Subscribe to state changes.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }
}

/// Capability for the reconnect bridge; releasing it stops the task.
pub struct ConnectivitySubscription {
    task: JoinHandle<()>,
}

impl ConnectivitySubscription {
    /// Stop the bridge task.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for ConnectivitySubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Run one drain per Offline → Online transition.
///
/// Online → Offline transitions are recorded by the monitor but trigger
/// nothing here.
pub fn drain_on_reconnect(
    monitor: &NetworkMonitor,
    processor: Arc<SyncProcessor>,
) -> ConnectivitySubscription {
    let mut rx = monitor.watch();

    let task = tokio::spawn(async move {
        let mut last = *rx.borrow();
        while rx.changed().await.is_ok() {
            let online = *rx.borrow_and_update();
            if online && !last {
                debug!("connectivity restored, draining sync queue");
                let report = processor.process().await;
                info!(
                    "reconnect drain: {}/{} delivered",
                    report.delivered, report.attempted
                );
            }
            last = online;
        }
    });

    ConnectivitySubscription { task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{SyncAction, SyncKind};
    use crate::endpoint::SyncEndpoint;
    use crate::processor::ProcessorConfig;
    use crate::queue::SyncQueue;
    use async_trait::async_trait;
    use momenta_common::Result;
    use momenta_storage::MemoryStore;
    use serde_json::json;
    use std::time::Duration;

    struct OkEndpoint;

    #[async_trait]
    impl SyncEndpoint for OkEndpoint {
        fn name(&self) -> &str {
            "ok"
        }

        async fn send(&self, _action: &SyncAction) -> Result<()> {
            Ok(())
        }
    }

    async fn rig(initially_online: bool) -> (Arc<SyncQueue>, Arc<NetworkMonitor>, Arc<SyncProcessor>) {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(SyncQueue::load(store).await);
        let monitor = Arc::new(NetworkMonitor::new(initially_online));
        let processor = Arc::new(SyncProcessor::new(
            queue.clone(),
            Arc::new(OkEndpoint),
            monitor.clone(),
            ProcessorConfig::default(),
        ));
        (queue, monitor, processor)
    }

    #[test]
    fn test_transitions() {
        let monitor = NetworkMonitor::new(false);
        assert!(!monitor.is_online());

        assert_eq!(
            monitor.report_reachable(true),
            NetworkTransition::WentOnline
        );
        assert!(monitor.is_online());

        assert_eq!(monitor.report_reachable(true), NetworkTransition::Unchanged);

        assert_eq!(
            monitor.report_reachable(false),
            NetworkTransition::WentOffline
        );
        assert!(!monitor.is_online());
    }

    #[tokio::test]
    async fn test_reconnect_triggers_drain() {
        let (queue, monitor, processor) = rig(false).await;
        queue.enqueue(SyncKind::CreateSession, json!({}), 3).await;

        let _subscription = drain_on_reconnect(&monitor, processor);

        monitor.report_reachable(true);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_going_offline_triggers_nothing() {
        let (queue, monitor, processor) = rig(true).await;

        let _subscription = drain_on_reconnect(&monitor, processor);

        queue.enqueue(SyncKind::UpdateTask, json!({}), 3).await;
        monitor.report_reachable(false);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn test_shutdown_releases_the_subscription() {
        let (queue, monitor, processor) = rig(false).await;
        queue.enqueue(SyncKind::RecordMood, json!({}), 3).await;

        let subscription = drain_on_reconnect(&monitor, processor);
        subscription.shutdown();
        tokio::time::sleep(Duration::from_millis(10)).await;

        monitor.report_reachable(true);
        tokio::time::sleep(Duration::from_millis(50)).await;

        // No bridge left to drain the queue.
        assert_eq!(queue.len().await, 1);
    }
}
