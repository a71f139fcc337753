//! Pipeline wiring: remap expansion, queued frame matching, action dispatch.

use crate::config::{ConfigError, EngineConfig};
use keyflow_keys::Key;
use keyflow_patterns::{
    ActionId, CompileDiagnostic, KeyFrame, Matcher, PatternForest,
};
use keyflow_queue::TaskQueue;
use keyflow_remap::{RemapError, RemapRules, MAX_CHAIN_DEPTH};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Task kind for logical key frames.
pub const KEY_FRAME_TASK: &str = "key-frame";
/// Task kind for recognized actions, consumed by the external executor.
pub const ACTION_TASK: &str = "action";
/// Task kind for configuration replacements.
pub const RELOAD_CONFIG_TASK: &str = "reload-config";

/// Priority for administrative tasks. Frames all share tier 0, so a reload
/// preempts the backlog without reordering frames relative to each other.
pub const ADMIN_PRIORITY: i32 = 10;

/// A frame of physical key state, before remap expansion.
#[derive(Debug, Clone)]
pub struct PhysicalFrame {
    /// Keys that went down this frame.
    pub pressed: Vec<Key>,
    /// Keys held down.
    pub held: Vec<Key>,
    /// Keys that went up this frame.
    pub released: Vec<Key>,
    /// Continuous hold duration per down key.
    pub hold_durations: HashMap<Key, Duration>,
    /// When the hook observed the frame.
    pub timestamp: Instant,
}

impl PhysicalFrame {
    /// A frame with no key activity.
    pub fn empty(timestamp: Instant) -> Self {
        Self {
            pressed: Vec::new(),
            held: Vec::new(),
            released: Vec::new(),
            hold_durations: HashMap::new(),
            timestamp,
        }
    }

    /// Add a key that went down this frame.
    pub fn with_pressed(mut self, key: Key) -> Self {
        self.pressed.push(key);
        self
    }

    /// Add a held key with its continuous hold duration.
    pub fn with_held(mut self, key: Key, duration: Duration) -> Self {
        self.held.push(key);
        self.hold_durations.insert(key, duration);
        self
    }

    /// Add a key that went up this frame.
    pub fn with_released(mut self, key: Key) -> Self {
        self.released.push(key);
        self
    }
}

/// The serialized form of a logical key frame, carried as a task payload.
///
/// Timestamps travel as milliseconds relative to the engine's epoch so the
/// payload round-trips through the queue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FramePayload {
    #[serde(default)]
    pub pressed: Vec<Key>,
    #[serde(default)]
    pub held: Vec<Key>,
    #[serde(default)]
    pub released: Vec<Key>,
    #[serde(default)]
    pub hold_ms: HashMap<Key, u64>,
    /// Milliseconds since the engine epoch.
    pub at_ms: u64,
}

impl FramePayload {
    fn to_key_frame(&self, epoch: Instant) -> KeyFrame {
        let mut frame = KeyFrame::empty(epoch + Duration::from_millis(self.at_ms));
        frame.pressed.extend(self.pressed.iter().copied());
        frame.held.extend(self.held.iter().copied());
        frame.released.extend(self.released.iter().copied());
        for (&key, &ms) in &self.hold_ms {
            frame.hold_durations.insert(key, Duration::from_millis(ms));
        }
        frame
    }
}

/// The payload of an `action` task, consumed by the external executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPayload {
    /// The completed shortcut's identifier.
    pub shortcut: String,
    /// The action to execute.
    pub action: ActionId,
    /// The pattern's compile-time priority.
    pub priority: u32,
    /// Match strength at completion time.
    pub confidence: f32,
}

/// Engine lifecycle signals for the logging/UI collaborator.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A configuration document was validated and swapped in.
    ConfigApplied {
        remaps: usize,
        shortcuts: usize,
        diagnostics: Vec<CompileDiagnostic>,
    },
    /// A configuration document was rejected; nothing changed.
    ConfigRejected { errors: Vec<RemapError> },
    /// A shortcut completed and its action task was enqueued.
    MatchEmitted {
        shortcut: String,
        action: ActionId,
        priority: u32,
        confidence: f32,
    },
}

/// Summary of a successful configuration replacement.
#[derive(Debug, Clone)]
pub struct ConfigReport {
    /// Number of remap rules now in effect.
    pub remaps: usize,
    /// Number of shortcut definitions submitted to the compiler.
    pub shortcuts: usize,
    /// Non-fatal compile findings; the offending shortcuts were skipped.
    pub diagnostics: Vec<CompileDiagnostic>,
}

struct EngineState {
    rules: RemapRules,
    matcher: Matcher,
}

struct EngineShared {
    state: Mutex<EngineState>,
    events: broadcast::Sender<EngineEvent>,
    epoch: Instant,
}

/// The assembled pipeline.
///
/// Physical frames are rewritten through the remap rules, enqueued as
/// `key-frame` tasks, and matched inside the queue's frame handler. Each
/// completed match is enqueued back as an `action` task, keeping the whole
/// pipeline on one serialized queue.
#[derive(Clone)]
pub struct Engine {
    queue: TaskQueue,
    shared: Arc<EngineShared>,
}

impl Engine {
    /// Wire an engine onto a queue, registering the `key-frame` and
    /// `reload-config` handlers. The `action` handler belongs to the
    /// external executor.
    pub fn new(queue: TaskQueue) -> Self {
        let (events, _) = broadcast::channel(256);
        let shared = Arc::new(EngineShared {
            state: Mutex::new(EngineState {
                rules: RemapRules::default(),
                matcher: Matcher::new(),
            }),
            events,
            epoch: Instant::now(),
        });

        let engine = Self { queue, shared };
        engine.register_frame_handler();
        engine.register_reload_handler();
        engine
    }

    /// The queue this engine dispatches through.
    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    /// Subscribe to engine lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.shared.events.subscribe()
    }

    /// Validate and apply a configuration document atomically.
    ///
    /// Remap errors reject the whole document and leave the previous rules
    /// and forest in effect. Shortcut compile findings are non-fatal and
    /// carried in the report.
    pub fn apply_config(&self, config: &EngineConfig) -> Result<ConfigReport, ConfigError> {
        let rules = match RemapRules::from_doc(&config.remaps) {
            Ok(rules) => rules,
            Err(report) => {
                let _ = self.shared.events.send(EngineEvent::ConfigRejected {
                    errors: report.errors().to_vec(),
                });
                return Err(ConfigError::InvalidRemaps(report));
            }
        };

        let (forest, diagnostics) = PatternForest::compile(&config.shortcuts);
        if let Ok(mut state) = self.shared.state.lock() {
            state.rules = rules;
            state.matcher.install(forest);
        }

        let report = ConfigReport {
            remaps: config.remaps.len(),
            shortcuts: config.shortcuts.len(),
            diagnostics,
        };
        let _ = self.shared.events.send(EngineEvent::ConfigApplied {
            remaps: report.remaps,
            shortcuts: report.shortcuts,
            diagnostics: report.diagnostics.clone(),
        });
        Ok(report)
    }

    /// Enqueue a configuration replacement as an administrative task so it
    /// preempts the frame backlog but still applies in queue order.
    pub async fn submit_config(&self, config: &EngineConfig) -> Result<Uuid, serde_json::Error> {
        let payload = serde_json::to_value(config)?;
        Ok(self
            .queue
            .enqueue(RELOAD_CONFIG_TASK, payload, ADMIN_PRIORITY)
            .await)
    }

    /// Rewrite a physical frame through the remap rules and enqueue the
    /// resulting logical frame for matching.
    pub async fn submit_frame(&self, frame: &PhysicalFrame) -> Result<Uuid, serde_json::Error> {
        let payload = {
            match self.shared.state.lock() {
                Ok(state) => remap_frame(&state.rules, frame, self.shared.epoch),
                Err(_) => FramePayload::default(),
            }
        };
        let payload = serde_json::to_value(&payload)?;
        Ok(self.queue.enqueue(KEY_FRAME_TASK, payload, 0).await)
    }

    fn register_frame_handler(&self) {
        let shared = self.shared.clone();
        let queue = self.queue.clone();
        self.queue.register_handler(KEY_FRAME_TASK, move |payload| {
            let shared = shared.clone();
            let queue = queue.clone();
            Box::pin(async move {
                let payload: FramePayload =
                    serde_json::from_value(payload).map_err(|e| e.to_string())?;
                let frame = payload.to_key_frame(shared.epoch);

                // Matching is synchronous and never blocks; side effects go
                // back through the queue as new tasks.
                let matches = {
                    let mut state = shared
                        .state
                        .lock()
                        .map_err(|_| "engine state poisoned".to_string())?;
                    state.matcher.process_frame(&frame)
                };

                for m in matches {
                    let _ = shared.events.send(EngineEvent::MatchEmitted {
                        shortcut: m.id.clone(),
                        action: m.action.clone(),
                        priority: m.priority,
                        confidence: m.confidence,
                    });
                    let action = serde_json::to_value(&ActionPayload {
                        shortcut: m.id,
                        action: m.action,
                        priority: m.priority,
                        confidence: m.confidence,
                    })
                    .map_err(|e| e.to_string())?;
                    queue.enqueue(ACTION_TASK, action, 0).await;
                }
                Ok(())
            })
        });
    }

    fn register_reload_handler(&self) {
        let engine = self.clone();
        self.queue
            .register_handler(RELOAD_CONFIG_TASK, move |payload| {
                let engine = engine.clone();
                Box::pin(async move {
                    let config: EngineConfig =
                        serde_json::from_value(payload).map_err(|e| e.to_string())?;
                    // A rejected document is reported through events, not
                    // as a handler failure.
                    let _ = engine.apply_config(&config);
                    Ok(())
                })
            });
    }
}

/// Expand every physical key through its remap chain. A key with a rule is
/// replaced by the chain's closure (possibly nothing); a key without one
/// passes through unchanged.
fn remap_frame(rules: &RemapRules, frame: &PhysicalFrame, epoch: Instant) -> FramePayload {
    let mut payload = FramePayload {
        at_ms: frame
            .timestamp
            .saturating_duration_since(epoch)
            .as_millis() as u64,
        ..FramePayload::default()
    };

    let expand = |key: Key| -> Vec<Key> {
        if rules.contains(&key) {
            rules.resolve_chain(key, MAX_CHAIN_DEPTH).into_iter().collect()
        } else {
            vec![key]
        }
    };

    for &key in &frame.pressed {
        for target in expand(key) {
            if !payload.pressed.contains(&target) {
                payload.pressed.push(target);
            }
        }
    }
    for &key in &frame.held {
        for target in expand(key) {
            if !payload.held.contains(&target) {
                payload.held.push(target);
            }
        }
    }
    for &key in &frame.released {
        for target in expand(key) {
            if !payload.released.contains(&target) {
                payload.released.push(target);
            }
        }
    }
    for (&key, &duration) in &frame.hold_durations {
        let ms = duration.as_millis() as u64;
        for target in expand(key) {
            // Several sources can land on one target; the longest hold wins.
            let entry = payload.hold_ms.entry(target).or_insert(ms);
            if *entry < ms {
                *entry = ms;
            }
        }
    }

    payload
}
