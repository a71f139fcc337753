//! # keyflow-patterns
//!
//! Shortcut compilation and live pattern matching.
//!
//! ## Features
//!
//! - Shortcut schema: ordered hold/combo trigger steps with timing and
//!   strictness conditions
//! - Compilation into a forest of decision trees keyed by first required
//!   key, with compile-time priorities resolving ambiguity
//! - Best-effort diagnostics: a bad shortcut is skipped, not fatal
//! - Live matching of per-frame key state with overlapping in-flight
//!   partial matches

mod forest;
mod frame;
mod matcher;
mod step;

pub use forest::{
    CompileDiagnostic, CompiledPattern, NodeId, PatternForest, PatternNode, StepConditions,
};
pub use frame::KeyFrame;
pub use matcher::{Matcher, PatternMatch};
pub use step::{ActionId, ShortcutDefinition, StepKind, TriggerStep};
