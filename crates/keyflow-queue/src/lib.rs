//! # keyflow-queue
//!
//! An ordered, retrying task queue for asynchronous side effects.
//!
//! ## Features
//!
//! - Priority ordering with stable FIFO within a priority tier
//! - Strictly serial dispatch by default (one handler in flight), so state
//!   transitions apply in event order
//! - Bounded retries with a delay, and per-attempt timeouts treated as
//!   failures
//! - Broadcast lifecycle events for logging/UI subscribers
//!
//! Handler errors never escape the dispatch boundary: they become retry or
//! failure transitions, observable through [`QueueEvent`].

mod config;
mod error;
mod queue;
mod task;

pub use config::QueueConfig;
pub use error::TaskError;
pub use queue::{QueueEvent, TaskFuture, TaskQueue, TaskResult};
pub use task::{QueueStatus, QueuedTask, TaskKind, TaskStatus};
