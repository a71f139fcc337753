//! # keyflow-engine
//!
//! The assembled keyflow pipeline.
//!
//! Raw key frames flow through the remap resolver, get enqueued on the
//! ordered task queue, and are matched against the compiled pattern forest
//! inside the queue's frame handler. Each completed match is enqueued back
//! as an `action` task for the external executor, so the whole pipeline
//! stays serialized and state transitions apply in event order.
//!
//! Configuration arrives as whole-document replacements ([`EngineConfig`]),
//! validated and swapped atomically; a rejected document changes nothing.

mod config;
mod engine;

pub use config::{ConfigError, EngineConfig};
pub use engine::{
    ActionPayload, ConfigReport, Engine, EngineEvent, FramePayload, PhysicalFrame, ACTION_TASK,
    ADMIN_PRIORITY, KEY_FRAME_TASK, RELOAD_CONFIG_TASK,
};
