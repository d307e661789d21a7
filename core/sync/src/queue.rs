//! Restart-safe FIFO queue of pending sync actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::action::{SyncAction, SyncKind};
use momenta_common::ActionId;
use momenta_storage::KeyValueStore;

/// Durable-store key holding the queue, dead letters, and last sync time.
pub const QUEUE_STORAGE_KEY: &str = "offline-storage";

/// Most recent dead letters retained for diagnosis.
const DEAD_LETTER_CAP: usize = 100;

/// An action that exhausted its retry budget, retained for diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    /// The action as it looked when it was dropped.
    pub action: SyncAction,
    /// When the retry budget ran out.
    pub dropped_at: DateTime<Utc>,
    /// The delivery error that spent the final attempt.
    pub last_error: String,
}

/// Everything the queue persists. Transient flags are never stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedState {
    sync_queue: Vec<SyncAction>,
    #[serde(default)]
    dead_letter: Vec<DeadLetter>,
    #[serde(default)]
    last_sync_time: Option<DateTime<Utc>>,
}

/// Pending and dead-lettered action counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStatus {
    /// Actions waiting in the live queue.
    pub pending: usize,
    /// Actions dropped after exhausting their retry budget.
    pub dead_lettered: usize,
}

/// Outcome of a retry bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The action stays queued with the new retry count.
    Retained { retry_count: u32 },
    /// The bump would exceed the budget; the action moved to the dead letters.
    DeadLettered,
    /// No action with that id is queued.
    Missing,
}

/// Ordered, persisted queue of pending mutations.
///
/// The full state is rewritten to the durable store on every mutation.
/// Mutations apply to the in-memory state first; a failed persist is
/// logged and reconciled by the next successful full write, so enqueue
/// always succeeds from the caller's point of view.
pub struct SyncQueue {
    store: Arc<dyn KeyValueStore>,
    state: RwLock<PersistedState>,
}

impl SyncQueue {
    /// Restore the queue from the durable store.
    ///
    /// Missing or unreadable state starts an empty queue; the condition
    /// is logged, never surfaced.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let state = match store.get(QUEUE_STORAGE_KEY).await {
            Ok(Some(json)) => match serde_json::from_str::<PersistedState>(&json) {
                Ok(state) => {
                    debug!(
                        "restored sync queue: {} pending, {} dead-lettered",
                        state.sync_queue.len(),
                        state.dead_letter.len()
                    );
                    state
                }
                Err(e) => {
                    warn!("sync queue state is unreadable, starting empty: {}", e);
                    PersistedState::default()
                }
            },
            Ok(None) => PersistedState::default(),
            Err(e) => {
                warn!("failed to read sync queue state, starting empty: {}", e);
                PersistedState::default()
            }
        };

        Self {
            store,
            state: RwLock::new(state),
        }
    }

    /// Create an action and append it to the queue.
    ///
    /// The in-memory queue always reflects the addition; a storage
    /// failure only means the write is not yet guaranteed durable.
    pub async fn enqueue(&self, kind: SyncKind, payload: Value, max_retries: u32) -> SyncAction {
        let action = SyncAction::new(kind, payload, max_retries);

        let mut state = self.state.write().await;
        state.sync_queue.push(action.clone());
        debug!(
            "enqueued {} action {} ({} pending)",
            action.kind.as_str(),
            action.id,
            state.sync_queue.len()
        );
        self.persist(&state).await;

        action
    }

    /// Delete the action with this id. No-op when absent.
    pub async fn remove(&self, id: &ActionId) {
        let mut state = self.state.write().await;
        let before = state.sync_queue.len();
        state.sync_queue.retain(|a| a.id != *id);

        if state.sync_queue.len() != before {
            self.persist(&state).await;
        }
    }

    /// Bump the retry count for this action.
    ///
    /// Increment-then-compare: when the bumped count would exceed
    /// `max_retries`, the action leaves the queue and is retained in the
    /// dead-letter log with `error` as its final failure.
    pub async fn increment_retry(&self, id: &ActionId, error: &str) -> RetryOutcome {
        let mut state = self.state.write().await;

        let Some(pos) = state.sync_queue.iter().position(|a| a.id == *id) else {
            return RetryOutcome::Missing;
        };

        let bumped = state.sync_queue[pos].retry_count + 1;
        let outcome = if bumped > state.sync_queue[pos].max_retries {
            let action = state.sync_queue.remove(pos);
            warn!(
                "action {} exhausted its retry budget after {} attempts, dead-lettering",
                action.id, bumped
            );
            state.dead_letter.push(DeadLetter {
                action,
                dropped_at: Utc::now(),
                last_error: error.to_string(),
            });
            if state.dead_letter.len() > DEAD_LETTER_CAP {
                let overflow = state.dead_letter.len() - DEAD_LETTER_CAP;
                state.dead_letter.drain(..overflow);
            }
            RetryOutcome::DeadLettered
        } else {
            state.sync_queue[pos].retry_count = bumped;
            RetryOutcome::Retained {
                retry_count: bumped,
            }
        };

        self.persist(&state).await;
        outcome
    }

    /// Point-in-time FIFO view of the queue.
    ///
    /// Actions enqueued after the snapshot is taken are not in it.
    pub async fn snapshot(&self) -> Vec<SyncAction> {
        self.state.read().await.sync_queue.clone()
    }

    /// Pending and dead-lettered counts.
    pub async fn status(&self) -> QueueStatus {
        let state = self.state.read().await;
        QueueStatus {
            pending: state.sync_queue.len(),
            dead_lettered: state.dead_letter.len(),
        }
    }

    /// The retained record of actions that exhausted their retries.
    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.state.read().await.dead_letter.clone()
    }

    /// When the last drain pass completed, if any.
    pub async fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.last_sync_time
    }

    /// Record the completion time of a drain pass.
    pub async fn record_sync_time(&self, at: DateTime<Utc>) {
        let mut state = self.state.write().await;
        state.last_sync_time = Some(at);
        self.persist(&state).await;
    }

    /// Number of pending actions.
    pub async fn len(&self) -> usize {
        self.state.read().await.sync_queue.len()
    }

    /// Check if the queue has no pending actions.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.sync_queue.is_empty()
    }

    /// Rewrite the full persisted state.
    ///
    /// Called with the state lock held so full writes stay serialized.
    async fn persist(&self, state: &PersistedState) {
        match serde_json::to_string(state) {
            Ok(json) => {
                if let Err(e) = self.store.set(QUEUE_STORAGE_KEY, &json).await {
                    warn!("failed to persist sync queue: {}", e);
                }
            }
            Err(e) => warn!("failed to serialize sync queue: {}", e),
        }
    }
}
