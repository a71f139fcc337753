//! Task execution errors.

use crate::task::TaskKind;
use thiserror::Error;

/// Why a task attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// No handler is registered for the task's kind; the task fails
    /// permanently without retries.
    #[error("no handler registered for task kind '{kind}'")]
    NoHandlerRegistered { kind: TaskKind },

    /// The handler returned an error; consumes a retry.
    #[error("handler failed: {message}")]
    HandlerFailed { message: String },

    /// The handler did not finish before the per-task deadline; treated
    /// identically to a handler failure.
    #[error("handler timed out")]
    TimedOut,
}
