//! Single-flight drain of the sync queue.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::action::SyncAction;
use crate::endpoint::SyncEndpoint;
use crate::network::NetworkMonitor;
use crate::queue::SyncQueue;
use momenta_common::{ActionId, Error};

/// Processor settings.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Time budget for each individual send; a timeout counts as a
    /// send failure against the action's retry budget.
    pub send_timeout: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(30),
        }
    }
}

/// Why a drain request did or did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The pass ran to completion.
    Completed,
    /// The monitor reported offline; nothing was attempted.
    Offline,
    /// Another pass was in flight; it re-drains on our behalf.
    AlreadyDraining,
}

/// Result of one drain request.
///
/// Failures here are per-request reporting for the UI; the durable retry
/// bookkeeping lives in the queue.
#[derive(Debug, Clone)]
pub struct DrainReport {
    pub outcome: DrainOutcome,
    /// Sends attempted across all passes of this request.
    pub attempted: usize,
    /// Actions delivered and removed from the queue.
    pub delivered: usize,
    /// Actions that failed during this request, with their errors.
    pub failures: Vec<(ActionId, String)>,
}

impl DrainReport {
    fn skipped(outcome: DrainOutcome) -> Self {
        Self {
            outcome,
            attempted: 0,
            delivered: 0,
            failures: Vec::new(),
        }
    }
}

/// Clears the drain flag when the pass ends, however it ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drains the sync queue against the remote endpoint.
///
/// At most one drain pass is in flight at a time; overlapping requests
/// collapse into it and schedule a follow-up pass, so actions enqueued
/// mid-pass are picked up without waiting for the next connectivity
/// transition.
pub struct SyncProcessor {
    queue: Arc<SyncQueue>,
    endpoint: Arc<dyn SyncEndpoint>,
    monitor: Arc<NetworkMonitor>,
    draining: AtomicBool,
    rerun: AtomicBool,
    send_timeout: Duration,
}

impl SyncProcessor {
    /// Create a processor over the given queue, endpoint, and monitor.
    pub fn new(
        queue: Arc<SyncQueue>,
        endpoint: Arc<dyn SyncEndpoint>,
        monitor: Arc<NetworkMonitor>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            queue,
            endpoint,
            monitor,
            draining: AtomicBool::new(false),
            rerun: AtomicBool::new(false),
            send_timeout: config.send_timeout,
        }
    }

    /// Whether a drain pass is currently running.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Drain the queue once.
    ///
    /// No-op while offline. Sends are strictly sequential in snapshot
    /// order; one action's failure never aborts the pass.
    pub async fn process(&self) -> DrainReport {
        if !self.monitor.is_online() {
            debug!("drain requested while offline, skipping");
            return DrainReport::skipped(DrainOutcome::Offline);
        }

        if self
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // The in-flight pass re-drains anything we would have sent.
            self.rerun.store(true, Ordering::SeqCst);
            debug!("drain already in flight, deferring");
            return DrainReport::skipped(DrainOutcome::AlreadyDraining);
        }
        let _guard = DrainGuard(&self.draining);

        let mut report = DrainReport::skipped(DrainOutcome::Completed);
        let mut aborted = false;

        loop {
            let snapshot = self.queue.snapshot().await;
            debug!("drain pass over {} actions", snapshot.len());

            for action in snapshot {
                if !self.monitor.is_online() {
                    debug!("went offline mid-pass, stopping drain");
                    aborted = true;
                    break;
                }
                self.attempt(&action, &mut report).await;
            }

            self.queue.record_sync_time(Utc::now()).await;

            if aborted || !self.rerun.swap(false, Ordering::SeqCst) {
                break;
            }
            debug!("actions arrived during the pass, draining again");
        }

        info!(
            "drain finished: {}/{} delivered, {} failed",
            report.delivered,
            report.attempted,
            report.failures.len()
        );
        report
    }

    /// Send one action and record the result.
    async fn attempt(&self, action: &SyncAction, report: &mut DrainReport) {
        report.attempted += 1;

        match timeout(self.send_timeout, self.endpoint.send(action)).await {
            Ok(Ok(())) => {
                debug!("delivered {} action {}", action.kind.as_str(), action.id);
                self.queue.remove(&action.id).await;
                report.delivered += 1;
            }
            Ok(Err(e)) => {
                warn!("failed to deliver action {}: {}", action.id, e);
                let message = e.to_string();
                self.queue.increment_retry(&action.id, &message).await;
                report.failures.push((action.id.clone(), message));
            }
            Err(_) => {
                let message =
                    Error::Timeout(format!("send exceeded {:?}", self.send_timeout)).to_string();
                warn!("action {}: {}", action.id, message);
                self.queue.increment_retry(&action.id, &message).await;
                report.failures.push((action.id.clone(), message));
            }
        }
    }
}
