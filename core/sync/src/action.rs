//! Pending mutation requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use momenta_common::ActionId;

/// Default retry budget for a newly enqueued action.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// The closed set of mutations the app can queue for sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    /// A focus session was started.
    CreateSession,
    /// A focus session finished.
    CompleteSession,
    /// A task was created or edited.
    UpdateTask,
    /// A task was removed.
    DeleteTask,
    /// A badge was earned.
    UnlockBadge,
    /// A mood check-in was recorded.
    RecordMood,
}

impl SyncKind {
    /// Stable wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncKind::CreateSession => "create_session",
            SyncKind::CompleteSession => "complete_session",
            SyncKind::UpdateTask => "update_task",
            SyncKind::DeleteTask => "delete_task",
            SyncKind::UnlockBadge => "unlock_badge",
            SyncKind::RecordMood => "record_mood",
        }
    }
}

/// A pending mutation waiting to be delivered to the remote endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncAction {
    /// Unique id, generated at enqueue time.
    pub id: ActionId,
    /// Which mutation this is.
    pub kind: SyncKind,
    /// Opaque structured data for the mutation.
    pub payload: Value,
    /// When the action entered the queue.
    pub enqueued_at: DateTime<Utc>,
    /// Delivery failures so far. Never exceeds `max_retries`.
    pub retry_count: u32,
    /// Retry ceiling, fixed at enqueue time.
    pub max_retries: u32,
}

impl SyncAction {
    /// Create a fresh action with a zero retry count.
    pub fn new(kind: SyncKind, payload: Value, max_retries: u32) -> Self {
        Self {
            id: ActionId::generate(),
            kind,
            payload,
            enqueued_at: Utc::now(),
            retry_count: 0,
            max_retries,
        }
    }

    /// Attempts left before the retry budget is exhausted.
    pub fn retries_remaining(&self) -> u32 {
        self.max_retries.saturating_sub(self.retry_count)
    }
}
