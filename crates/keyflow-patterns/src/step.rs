//! Shortcut schema types.

use keyflow_keys::Key;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The kind of a trigger step.
///
/// `Press`, `Release`, and `Single` are reachable leaf kinds in the schema,
/// but only `Hold` and `Combo` participate in decision-tree construction;
/// the compiler rejects the others with a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Continuous depression of the step's keys for a minimum duration.
    Hold,
    /// Simultaneous depression of the step's keys within a time window.
    Combo,
    /// A single key-down edge.
    Press,
    /// A single key-up edge.
    Release,
    /// One press-and-release.
    Single,
}

impl StepKind {
    /// Whether this kind may appear in the compiled decision forest.
    pub fn anchors_tree(&self) -> bool {
        matches!(self, Self::Hold | Self::Combo)
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hold => "hold",
            Self::Combo => "combo",
            Self::Press => "press",
            Self::Release => "release",
            Self::Single => "single",
        };
        write!(f, "{}", name)
    }
}

/// One step of a multi-step shortcut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerStep {
    /// What satisfies this step.
    pub kind: StepKind,
    /// The keys this step references; a combo requires all of them together.
    #[serde(default)]
    pub keys: Vec<Key>,
    /// Max time for this step to complete relative to the previous step.
    #[serde(default)]
    pub window_ms: Option<u64>,
    /// Minimum continuous-press duration for a hold step.
    #[serde(default)]
    pub hold_ms: Option<u64>,
    /// If true, extraneous key presses during the step invalidate it.
    #[serde(default)]
    pub strict: bool,
}

impl TriggerStep {
    /// A hold step on a single key with a minimum press duration.
    pub fn hold(key: Key, hold_ms: u64) -> Self {
        Self {
            kind: StepKind::Hold,
            keys: vec![key],
            window_ms: None,
            hold_ms: Some(hold_ms),
            strict: false,
        }
    }

    /// A combo step over a set of keys.
    pub fn combo(keys: Vec<Key>) -> Self {
        Self {
            kind: StepKind::Combo,
            keys,
            window_ms: None,
            hold_ms: None,
            strict: false,
        }
    }

    /// Set the completion window relative to the previous step.
    pub fn with_window(mut self, window_ms: u64) -> Self {
        self.window_ms = Some(window_ms);
        self
    }

    /// Mark the step strict: extraneous keys invalidate it.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// The completion window as a duration.
    pub fn window(&self) -> Option<Duration> {
        self.window_ms.map(Duration::from_millis)
    }

    /// The minimum hold duration.
    pub fn hold_time(&self) -> Option<Duration> {
        self.hold_ms.map(Duration::from_millis)
    }
}

/// The action a completed shortcut resolves to, by identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<&str> for ActionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ActionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user-facing shortcut: an ordered sequence of trigger steps and the
/// action it produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortcutDefinition {
    /// Unique identifier, used in diagnostics and emitted matches.
    pub id: String,
    /// The steps, in order; the first step anchors the decision forest.
    #[serde(default)]
    pub steps: Vec<TriggerStep>,
    /// The action to emit on a completed match.
    pub action: ActionId,
}

impl ShortcutDefinition {
    /// Create a shortcut with no steps yet.
    pub fn new(id: impl Into<String>, action: impl Into<ActionId>) -> Self {
        Self {
            id: id.into(),
            steps: Vec::new(),
            action: action.into(),
        }
    }

    /// Append a step.
    pub fn step(mut self, step: TriggerStep) -> Self {
        self.steps.push(step);
        self
    }
}
