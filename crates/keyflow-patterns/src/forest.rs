//! Compilation of shortcut definitions into a decision forest.

use crate::step::{ActionId, ShortcutDefinition, StepKind, TriggerStep};
use keyflow_keys::Key;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Index of a node in the forest arena.
pub type NodeId = usize;

/// A non-fatal finding from compilation. The offending shortcut is skipped
/// (or truncated) and the rest of the forest compiles normally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum CompileDiagnostic {
    /// A shortcut with no steps, or a step with no keys.
    #[error("shortcut '{id}' has no steps or a step with no keys")]
    EmptyPattern { id: String },

    /// A step kind other than hold/combo where the tree requires one.
    #[error("shortcut '{id}' uses step kind '{kind}' where only hold or combo may appear")]
    UnsupportedStepType { id: String, kind: StepKind },
}

/// The timing and strictness conditions attached to a node.
#[derive(Debug, Clone, PartialEq)]
pub struct StepConditions {
    /// Max time for this step to complete relative to the previous step.
    pub window_ms: Option<u64>,
    /// Minimum continuous-press duration (hold nodes).
    pub hold_ms: Option<u64>,
    /// Extraneous keys invalidate the step.
    pub strict: bool,
}

impl StepConditions {
    fn from_step(step: &TriggerStep) -> Self {
        Self {
            window_ms: step.window_ms,
            hold_ms: step.hold_ms,
            strict: step.strict,
        }
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

/// A shortcut as it lives inside the forest: the steps still ahead of a
/// given node, plus its compile-time priority and live confidence.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// The originating shortcut's identifier.
    pub id: String,
    /// Steps after the node this pattern is attached to.
    pub remaining_steps: Vec<TriggerStep>,
    /// The action emitted on completion.
    pub action: ActionId,
    /// Compile-time score; higher wins at shared nodes.
    pub priority: u32,
    /// Live accumulator of partial-match strength.
    pub confidence: f32,
}

/// A node in the decision forest.
#[derive(Debug, Clone)]
pub struct PatternNode {
    /// Hold or combo; other kinds never materialize as nodes.
    pub kind: StepKind,
    /// The keys this node's step requires.
    pub keys: Vec<Key>,
    /// Timing and strictness conditions.
    pub conditions: StepConditions,
    /// Patterns anchored here, sorted descending by priority (stable).
    pub patterns: Vec<CompiledPattern>,
    /// Child nodes, keyed by the first key of the next step.
    pub children: HashMap<Key, NodeId>,
}

/// The compiled decision forest: two root maps (hold-anchored and
/// combo-anchored) over an arena of nodes.
///
/// The forest is owned exclusively by the matcher and rebuilt wholesale when
/// the shortcut configuration changes; nodes are never mutated from outside.
#[derive(Debug, Clone, Default)]
pub struct PatternForest {
    pub(crate) nodes: Vec<PatternNode>,
    hold_roots: HashMap<Key, NodeId>,
    combo_roots: HashMap<Key, NodeId>,
}

impl PatternForest {
    /// Compile a list of shortcut definitions.
    ///
    /// Compilation is best-effort: a bad shortcut contributes a diagnostic
    /// and is skipped (or registered only up to the node already built),
    /// never aborting the rest of the forest.
    pub fn compile(shortcuts: &[ShortcutDefinition]) -> (Self, Vec<CompileDiagnostic>) {
        let mut forest = Self::default();
        let mut diagnostics = Vec::new();
        for def in shortcuts {
            forest.insert(def, &mut diagnostics);
        }
        (forest, diagnostics)
    }

    /// Roots anchored by a hold first step.
    pub fn hold_roots(&self) -> &HashMap<Key, NodeId> {
        &self.hold_roots
    }

    /// Roots anchored by a combo first step.
    pub fn combo_roots(&self) -> &HashMap<Key, NodeId> {
        &self.combo_roots
    }

    /// The node behind an id.
    pub fn node(&self, id: NodeId) -> &PatternNode {
        &self.nodes[id]
    }

    /// Total number of nodes across both forests.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn insert(&mut self, def: &ShortcutDefinition, diagnostics: &mut Vec<CompileDiagnostic>) {
        let Some(first) = def.steps.first() else {
            diagnostics.push(CompileDiagnostic::EmptyPattern { id: def.id.clone() });
            return;
        };
        if first.keys.is_empty() {
            diagnostics.push(CompileDiagnostic::EmptyPattern { id: def.id.clone() });
            return;
        }
        // Only hold and combo steps may anchor a shortcut.
        if !first.kind.anchors_tree() {
            diagnostics.push(CompileDiagnostic::UnsupportedStepType {
                id: def.id.clone(),
                kind: first.kind,
            });
            return;
        }

        let pattern = CompiledPattern {
            id: def.id.clone(),
            remaining_steps: def.steps[1..].to_vec(),
            action: def.action.clone(),
            priority: priority_of(def),
            confidence: 0.0,
        };

        let root_key = first.keys[0];
        let root = self.root_for(first, root_key);
        self.add_pattern(root, pattern.clone());

        // Materialize one descendant per remaining step, each keyed by that
        // step's first key and holding the pattern advanced by one step.
        let mut current = root;
        for (idx, step) in def.steps[1..].iter().enumerate() {
            if !step.kind.anchors_tree() {
                diagnostics.push(CompileDiagnostic::UnsupportedStepType {
                    id: def.id.clone(),
                    kind: step.kind,
                });
                return;
            }
            let Some(&child_key) = step.keys.first() else {
                diagnostics.push(CompileDiagnostic::EmptyPattern { id: def.id.clone() });
                return;
            };
            let child = self.child_for(current, step, child_key);
            let advanced = CompiledPattern {
                remaining_steps: def.steps[idx + 2..].to_vec(),
                ..pattern.clone()
            };
            self.add_pattern(child, advanced);
            current = child;
        }
    }

    fn new_node(&mut self, step: &TriggerStep) -> NodeId {
        self.nodes.push(PatternNode {
            kind: step.kind,
            keys: step.keys.clone(),
            conditions: StepConditions::from_step(step),
            patterns: Vec::new(),
            children: HashMap::new(),
        });
        self.nodes.len() - 1
    }

    fn root_for(&mut self, step: &TriggerStep, key: Key) -> NodeId {
        let existing = match step.kind {
            StepKind::Hold => self.hold_roots.get(&key).copied(),
            _ => self.combo_roots.get(&key).copied(),
        };
        if let Some(id) = existing {
            return id;
        }
        let id = self.new_node(step);
        match step.kind {
            StepKind::Hold => self.hold_roots.insert(key, id),
            _ => self.combo_roots.insert(key, id),
        };
        id
    }

    fn child_for(&mut self, parent: NodeId, step: &TriggerStep, key: Key) -> NodeId {
        if let Some(&id) = self.nodes[parent].children.get(&key) {
            return id;
        }
        let id = self.new_node(step);
        self.nodes[parent].children.insert(key, id);
        id
    }

    fn add_pattern(&mut self, node: NodeId, pattern: CompiledPattern) {
        let node = &mut self.nodes[node];
        node.patterns.push(pattern);
        // Stable sort: equal priorities keep declaration order.
        node.patterns.sort_by(|a, b| b.priority.cmp(&a.priority));
    }
}

/// Compile-time score: longer, richer, hold-first patterns dominate
/// shorter/combo-first ones anchored at the same node.
fn priority_of(def: &ShortcutDefinition) -> u32 {
    let step_count = def.steps.len() as u32;
    let key_count: usize = def.steps.iter().map(|s| s.keys.len()).sum();
    let hold_bonus = match def.steps.first() {
        Some(step) if step.kind == StepKind::Hold => 50,
        _ => 0,
    };
    100 * step_count + 10 * key_count as u32 + hold_bonus
}
