//! Queue configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for a queue instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Handler invocations allowed in flight at once. The default of 1 keeps
    /// dispatch strictly serial so frames apply in event order.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Retries after the first failed attempt before a task fails for good.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before a failed task becomes eligible again.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Per-attempt deadline; expiry counts as a failure.
    #[serde(default = "default_task_timeout_ms")]
    pub task_timeout_ms: u64,
}

fn default_max_concurrent() -> usize {
    1
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1000
}
fn default_task_timeout_ms() -> u64 {
    30_000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            task_timeout_ms: default_task_timeout_ms(),
        }
    }
}

impl QueueConfig {
    /// The retry delay as a duration.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// The per-attempt deadline as a duration.
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }
}
