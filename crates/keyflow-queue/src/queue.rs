//! The ordered task queue.

use crate::config::QueueConfig;
use crate::error::TaskError;
use crate::task::{QueueStatus, QueuedTask, TaskKind, TaskStatus};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

/// What a handler attempt returns.
pub type TaskResult = Result<(), String>;

/// The boxed future a handler produces per invocation.
pub type TaskFuture = Pin<Box<dyn Future<Output = TaskResult> + Send>>;

type Handler = Arc<dyn Fn(serde_json::Value) -> TaskFuture + Send + Sync>;

/// Queue lifecycle signals, exposed for logging/UI subscribers.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    /// A task entered the live set.
    Added { id: Uuid, kind: TaskKind },
    /// A handler invocation started.
    Started { id: Uuid, kind: TaskKind },
    /// The handler succeeded and the task left the live set.
    Completed { id: Uuid, kind: TaskKind },
    /// An attempt failed; the task is pending again and becomes eligible
    /// after the retry delay.
    Retrying {
        id: Uuid,
        kind: TaskKind,
        retry_count: u32,
        error: TaskError,
    },
    /// The task failed for good and left the live set.
    Failed {
        id: Uuid,
        kind: TaskKind,
        error: TaskError,
    },
    /// Nothing is pending and nothing is in flight.
    Empty,
}

struct QueueState {
    tasks: Vec<QueuedTask>,
    processing: usize,
}

struct QueueInner {
    config: QueueConfig,
    state: Mutex<QueueState>,
    handlers: RwLock<HashMap<TaskKind, Handler>>,
    events: broadcast::Sender<QueueEvent>,
    seq: AtomicU64,
}

enum Claim {
    Run {
        id: Uuid,
        kind: TaskKind,
        payload: serde_json::Value,
        handler: Handler,
    },
    Unhandled {
        id: Uuid,
        kind: TaskKind,
    },
}

/// An ordered, serializing task queue with bounded retries and per-task
/// timeouts.
///
/// The queue is an explicitly constructed handle: clone it and pass it to
/// every producer and consumer. A process that wants one consistent order
/// constructs exactly one and shares it; nothing here is global.
///
/// Dispatch is edge-triggered: every enqueue, completion, failure, and
/// timeout re-enters the dispatch loop rather than polling.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<QueueInner>,
}

impl TaskQueue {
    /// Create a queue with the given tunables.
    pub fn new(config: QueueConfig) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(QueueInner {
                config,
                state: Mutex::new(QueueState {
                    tasks: Vec::new(),
                    processing: 0,
                }),
                handlers: RwLock::new(HashMap::new()),
                events,
                seq: AtomicU64::new(0),
            }),
        }
    }

    /// The queue's configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Register the handler for a task kind. Exactly one handler exists per
    /// kind; re-registration overwrites.
    pub fn register_handler<F>(&self, kind: impl Into<TaskKind>, handler: F)
    where
        F: Fn(serde_json::Value) -> TaskFuture + Send + Sync + 'static,
    {
        if let Ok(mut handlers) = self.inner.handlers.write() {
            handlers.insert(kind.into(), Arc::new(handler));
        }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.inner.events.subscribe()
    }

    /// Add a task to the live set and trigger dispatch.
    ///
    /// The live set is kept sorted by priority descending, ties broken by
    /// enqueue order, so frames sharing one priority tier stay in order.
    pub async fn enqueue(
        &self,
        kind: impl Into<TaskKind>,
        payload: serde_json::Value,
        priority: i32,
    ) -> Uuid {
        let kind = kind.into();
        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed);
        let task = QueuedTask::new(kind.clone(), payload, priority, seq);
        let id = task.id;
        {
            let mut state = self.inner.state.lock().await;
            state.tasks.push(task);
            state.tasks.sort_by_key(|t| (Reverse(t.priority), t.seq));
        }
        self.emit(QueueEvent::Added { id, kind });
        self.spawn_dispatch();
        id
    }

    /// A point-in-time count of live tasks.
    pub async fn status(&self) -> QueueStatus {
        let state = self.inner.state.lock().await;
        let pending = state
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .count();
        QueueStatus {
            pending,
            processing: state.processing,
            total: state.tasks.len(),
        }
    }

    /// Drop every pending task. In-flight handlers run to their completion
    /// or timeout; there is no external cancellation for them.
    pub async fn clear(&self) {
        let mut state = self.inner.state.lock().await;
        state.tasks.retain(|t| t.status == TaskStatus::Processing);
    }

    fn emit(&self, event: QueueEvent) {
        let _ = self.inner.events.send(event);
    }

    fn spawn_dispatch(&self) {
        let queue = self.clone();
        tokio::spawn(async move {
            queue.dispatch().await;
        });
    }

    /// Advance processing: claim the highest-priority pending task and run
    /// its handler, repeating while concurrency slots are free.
    fn dispatch(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
        loop {
            let claim = {
                let mut state = self.inner.state.lock().await;
                if state.processing >= self.inner.config.max_concurrent {
                    return;
                }
                let Some(pos) = state
                    .tasks
                    .iter()
                    .position(|t| t.status == TaskStatus::Pending)
                else {
                    if state.processing == 0 {
                        self.emit(QueueEvent::Empty);
                    }
                    return;
                };

                let kind = state.tasks[pos].kind.clone();
                let handler = self
                    .inner
                    .handlers
                    .read()
                    .ok()
                    .and_then(|handlers| handlers.get(&kind).cloned());

                match handler {
                    None => {
                        // No handler: fail permanently, no retry.
                        let mut task = state.tasks.remove(pos);
                        task.status = TaskStatus::Failed;
                        Claim::Unhandled { id: task.id, kind }
                    }
                    Some(handler) => {
                        let (id, payload) = {
                            let task = &mut state.tasks[pos];
                            task.status = TaskStatus::Processing;
                            (task.id, task.payload.clone())
                        };
                        state.processing += 1;
                        Claim::Run {
                            id,
                            kind,
                            payload,
                            handler,
                        }
                    }
                }
            };

            match claim {
                Claim::Unhandled { id, kind } => {
                    self.emit(QueueEvent::Failed {
                        id,
                        kind: kind.clone(),
                        error: TaskError::NoHandlerRegistered { kind },
                    });
                    continue;
                }
                Claim::Run {
                    id,
                    kind,
                    payload,
                    handler,
                } => {
                    self.emit(QueueEvent::Started {
                        id,
                        kind: kind.clone(),
                    });
                    let queue = self.clone();
                    tokio::spawn(async move {
                        // The deadline races the handler; on expiry the
                        // attempt is dropped and counted as a failure.
                        let outcome = match tokio::time::timeout(
                            queue.inner.config.task_timeout(),
                            handler(payload),
                        )
                        .await
                        {
                            Ok(Ok(())) => Ok(()),
                            Ok(Err(message)) => Err(TaskError::HandlerFailed { message }),
                            Err(_) => Err(TaskError::TimedOut),
                        };
                        queue.finish(id, kind, outcome).await;
                    });
                    continue;
                }
            }
        }
        })
    }

    /// Resolve a finished attempt into completion, retry, or failure.
    async fn finish(&self, id: Uuid, kind: TaskKind, outcome: Result<(), TaskError>) {
        enum Next {
            Done,
            Retry(u32, TaskError),
            Exhausted(TaskError),
        }

        let next = {
            let mut state = self.inner.state.lock().await;
            state.processing = state.processing.saturating_sub(1);
            let Some(pos) = state.tasks.iter().position(|t| t.id == id) else {
                return;
            };
            match outcome {
                Ok(()) => {
                    state.tasks.remove(pos);
                    Next::Done
                }
                Err(error) => {
                    if state.tasks[pos].retry_count < self.inner.config.max_retries {
                        let task = &mut state.tasks[pos];
                        task.retry_count += 1;
                        task.status = TaskStatus::Pending;
                        Next::Retry(task.retry_count, error)
                    } else {
                        state.tasks.remove(pos);
                        Next::Exhausted(error)
                    }
                }
            }
        };

        match next {
            Next::Done => {
                self.emit(QueueEvent::Completed { id, kind });
                self.spawn_dispatch();
            }
            Next::Retry(retry_count, error) => {
                self.emit(QueueEvent::Retrying {
                    id,
                    kind,
                    retry_count,
                    error,
                });
                // Dispatch is not re-entered until the delay passes.
                let queue = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(queue.inner.config.retry_delay()).await;
                    queue.dispatch().await;
                });
            }
            Next::Exhausted(error) => {
                self.emit(QueueEvent::Failed { id, kind, error });
                self.spawn_dispatch();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn fast_config() -> QueueConfig {
        QueueConfig {
            max_concurrent: 1,
            max_retries: 2,
            retry_delay_ms: 10,
            task_timeout_ms: 200,
        }
    }

    async fn wait_for_empty(rx: &mut broadcast::Receiver<QueueEvent>) -> Vec<QueueEvent> {
        let mut seen = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match rx.recv().await {
                    Ok(QueueEvent::Empty) => break,
                    Ok(event) => seen.push(event),
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
        .await
        .expect("queue did not drain in time");
        seen
    }

    #[tokio::test]
    async fn test_priority_order() {
        let queue = TaskQueue::new(fast_config());
        let mut rx = queue.subscribe();

        let order = Arc::new(StdMutex::new(Vec::new()));
        let record = order.clone();
        queue.register_handler("record", move |payload| {
            let record = record.clone();
            Box::pin(async move {
                record.lock().unwrap().push(payload.as_i64().unwrap());
                Ok(())
            })
        });

        queue.enqueue("record", json!(1), 1).await;
        queue.enqueue("record", json!(5), 5).await;
        queue.enqueue("record", json!(2), 1).await;

        wait_for_empty(&mut rx).await;
        // Highest priority first; equal priorities keep enqueue order.
        assert_eq!(*order.lock().unwrap(), vec![5, 1, 2]);
    }

    #[tokio::test]
    async fn test_serial_execution() {
        let queue = TaskQueue::new(fast_config());
        let mut rx = queue.subscribe();

        let log = Arc::new(StdMutex::new(Vec::new()));
        let handler_log = log.clone();
        queue.register_handler("work", move |payload| {
            let log = handler_log.clone();
            Box::pin(async move {
                let n = payload.as_i64().unwrap();
                log.lock().unwrap().push(format!("start-{n}"));
                tokio::time::sleep(Duration::from_millis(10)).await;
                log.lock().unwrap().push(format!("end-{n}"));
                Ok(())
            })
        });

        for n in 0..3 {
            queue.enqueue("work", json!(n), 0).await;
        }
        wait_for_empty(&mut rx).await;

        // With one slot, no task starts before the previous one ends.
        assert_eq!(
            *log.lock().unwrap(),
            vec!["start-0", "end-0", "start-1", "end-1", "start-2", "end-2"]
        );
    }

    #[tokio::test]
    async fn test_failing_handler_retries_then_fails() {
        let queue = TaskQueue::new(fast_config());
        let mut rx = queue.subscribe();

        let attempts = Arc::new(StdMutex::new(0));
        let counter = attempts.clone();
        queue.register_handler("flaky", move |_| {
            let counter = counter.clone();
            Box::pin(async move {
                *counter.lock().unwrap() += 1;
                Err("boom".to_string())
            })
        });

        queue.enqueue("flaky", json!(null), 0).await;
        let events = wait_for_empty(&mut rx).await;

        let retries = events
            .iter()
            .filter(|e| matches!(e, QueueEvent::Retrying { .. }))
            .count();
        let failed = events
            .iter()
            .any(|e| matches!(e, QueueEvent::Failed { error: TaskError::HandlerFailed { .. }, .. }));
        assert_eq!(retries, 2);
        assert!(failed);
        // Initial attempt plus max_retries.
        assert_eq!(*attempts.lock().unwrap(), 3);
        assert_eq!(queue.status().await.total, 0);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let config = QueueConfig {
            max_retries: 0,
            task_timeout_ms: 20,
            ..fast_config()
        };
        let queue = TaskQueue::new(config);
        let mut rx = queue.subscribe();

        queue.register_handler("stuck", |_| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
        });

        queue.enqueue("stuck", json!(null), 0).await;
        let events = wait_for_empty(&mut rx).await;

        assert!(events
            .iter()
            .any(|e| matches!(e, QueueEvent::Failed { error: TaskError::TimedOut, .. })));
        assert_eq!(queue.status().await.total, 0);
    }

    #[tokio::test]
    async fn test_unregistered_kind_fails_without_retry() {
        let queue = TaskQueue::new(fast_config());
        let mut rx = queue.subscribe();

        queue.enqueue("nobody-home", json!(null), 0).await;
        let events = wait_for_empty(&mut rx).await;

        assert!(events.iter().any(|e| matches!(
            e,
            QueueEvent::Failed { error: TaskError::NoHandlerRegistered { .. }, .. }
        )));
        assert!(!events.iter().any(|e| matches!(e, QueueEvent::Started { .. })));
        assert!(!events.iter().any(|e| matches!(e, QueueEvent::Retrying { .. })));
    }

    #[tokio::test]
    async fn test_status_and_clear() {
        let queue = TaskQueue::new(fast_config());
        let mut rx = queue.subscribe();

        let release = Arc::new(Notify::new());
        let gate = release.clone();
        queue.register_handler("gated", move |_| {
            let gate = gate.clone();
            Box::pin(async move {
                gate.notified().await;
                Ok(())
            })
        });

        for _ in 0..3 {
            queue.enqueue("gated", json!(null), 0).await;
        }

        // Wait for the first task to claim the single slot.
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Ok(QueueEvent::Started { .. }) = rx.recv().await {
                    break;
                }
            }
        })
        .await
        .unwrap();

        let status = queue.status().await;
        assert_eq!(status.processing, 1);
        assert_eq!(status.pending, 2);
        assert_eq!(status.total, 3);

        // Clearing drops the pending tasks but not the in-flight one.
        queue.clear().await;
        let status = queue.status().await;
        assert_eq!(status.pending, 0);
        assert_eq!(status.total, 1);

        release.notify_one();
        wait_for_empty(&mut rx).await;
        assert_eq!(queue.status().await.total, 0);
    }

    #[tokio::test]
    async fn test_reregistration_overwrites() {
        let queue = TaskQueue::new(fast_config());
        let mut rx = queue.subscribe();

        let hits = Arc::new(StdMutex::new(Vec::new()));
        let first = hits.clone();
        queue.register_handler("job", move |_| {
            let first = first.clone();
            Box::pin(async move {
                first.lock().unwrap().push("first");
                Ok(())
            })
        });
        let second = hits.clone();
        queue.register_handler("job", move |_| {
            let second = second.clone();
            Box::pin(async move {
                second.lock().unwrap().push("second");
                Ok(())
            })
        });

        queue.enqueue("job", json!(null), 0).await;
        wait_for_empty(&mut rx).await;
        assert_eq!(*hits.lock().unwrap(), vec!["second"]);
    }

    #[tokio::test]
    async fn test_retry_waits_for_delay() {
        let config = QueueConfig {
            max_retries: 1,
            retry_delay_ms: 50,
            ..fast_config()
        };
        let queue = TaskQueue::new(config);
        let mut rx = queue.subscribe();

        let stamps = Arc::new(StdMutex::new(Vec::new()));
        let clock = stamps.clone();
        queue.register_handler("flaky", move |_| {
            let clock = clock.clone();
            Box::pin(async move {
                clock.lock().unwrap().push(std::time::Instant::now());
                Err("boom".to_string())
            })
        });

        queue.enqueue("flaky", json!(null), 0).await;
        wait_for_empty(&mut rx).await;

        let stamps = stamps.lock().unwrap();
        assert_eq!(stamps.len(), 2);
        assert!(stamps[1].duration_since(stamps[0]) >= Duration::from_millis(50));
    }
}
