//! Queued task types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The kind of a task, used to select its registered handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskKind(pub String);

impl TaskKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskKind {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskKind {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Waiting to be dispatched.
    Pending,
    /// A handler invocation is in flight.
    Processing,
    /// The handler succeeded; the task leaves the live set.
    Completed,
    /// Retries are exhausted (or no handler exists); the task leaves the
    /// live set.
    Failed,
}

impl TaskStatus {
    /// Check if the status is terminal (won't change).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check if the task is still live.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

/// A typed work item in the live set.
#[derive(Debug, Clone)]
pub struct QueuedTask {
    /// Unique task id.
    pub id: Uuid,
    /// Selects the registered handler.
    pub kind: TaskKind,
    /// Opaque payload passed to the handler.
    pub payload: serde_json::Value,
    /// When the task was enqueued.
    pub enqueued_at: DateTime<Utc>,
    /// Monotonic enqueue sequence; ties within a priority keep this order.
    pub seq: u64,
    /// Higher dispatches first.
    pub priority: i32,
    /// Attempts consumed so far.
    pub retry_count: u32,
    /// Current lifecycle status.
    pub status: TaskStatus,
}

impl QueuedTask {
    pub(crate) fn new(kind: TaskKind, payload: serde_json::Value, priority: i32, seq: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            payload,
            enqueued_at: Utc::now(),
            seq,
            priority,
            retry_count: 0,
            status: TaskStatus::Pending,
        }
    }
}

/// A point-in-time view of the live set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStatus {
    /// Tasks waiting for dispatch.
    pub pending: usize,
    /// Tasks with a handler in flight.
    pub processing: usize,
    /// All live tasks.
    pub total: usize,
}
