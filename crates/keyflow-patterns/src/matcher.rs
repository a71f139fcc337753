//! Live matching of key frames against the compiled forest.

use crate::forest::{NodeId, PatternForest, PatternNode};
use crate::frame::KeyFrame;
use crate::step::{ActionId, StepKind};
use std::time::{Duration, Instant};

/// A completed shortcut match, ready to be dispatched as an action.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    /// The originating shortcut's identifier.
    pub id: String,
    /// The action to execute.
    pub action: ActionId,
    /// The pattern's compile-time priority.
    pub priority: u32,
    /// Accumulated partial-match strength at completion time.
    pub confidence: f32,
}

/// An in-flight branch: the node whose step must complete next, and the
/// deadline by which it must do so.
#[derive(Debug, Clone)]
struct PartialMatch {
    node: NodeId,
    deadline: Option<Instant>,
}

enum NodeOutcome {
    /// The node's step is satisfied by this frame.
    Matched,
    /// Not satisfied yet; the branch stays in flight.
    Pending,
    /// The branch is dead (strict violation or impossible window).
    Invalidated,
}

/// Matches the live frame stream against a compiled [`PatternForest`].
///
/// The matcher exclusively owns its forest; reconfiguration swaps the whole
/// forest via [`Matcher::install`], dropping in-flight progress with it.
/// Frame processing is synchronous and never blocks; recognized matches are
/// returned to the caller, which dispatches them by enqueueing tasks.
#[derive(Debug, Default)]
pub struct Matcher {
    forest: PatternForest,
    partials: Vec<PartialMatch>,
}

impl Matcher {
    /// A matcher with nothing registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A matcher over an already-compiled forest.
    pub fn with_forest(forest: PatternForest) -> Self {
        Self {
            forest,
            partials: Vec::new(),
        }
    }

    /// Replace the forest wholesale, abandoning in-flight progress.
    pub fn install(&mut self, forest: PatternForest) {
        self.forest = forest;
        self.partials.clear();
    }

    /// The currently installed forest.
    pub fn forest(&self) -> &PatternForest {
        &self.forest
    }

    /// Number of in-flight partial matches.
    pub fn in_flight(&self) -> usize {
        self.partials.len()
    }

    /// Advance matching by one frame, returning completed matches.
    ///
    /// Multiple in-flight partials may coexist; a completed match does not
    /// cancel sibling partials; suppression of follow-up matches is the
    /// action-dispatch consumer's decision.
    pub fn process_frame(&mut self, frame: &KeyFrame) -> Vec<PatternMatch> {
        // An expired window abandons only that branch.
        self.partials
            .retain(|p| p.deadline.map_or(true, |d| frame.timestamp <= d));

        if frame.is_idle() {
            return Vec::new();
        }

        let mut satisfied: Vec<NodeId> = Vec::new();
        let mut survivors: Vec<PartialMatch> = Vec::new();

        // In-flight branches first: their nodes carry the next required step.
        for partial in std::mem::take(&mut self.partials) {
            match evaluate(self.forest.node(partial.node), frame) {
                NodeOutcome::Matched => satisfied.push(partial.node),
                NodeOutcome::Pending => survivors.push(partial),
                NodeOutcome::Invalidated => {}
            }
        }

        // Fresh root activations for keys down in this frame.
        let roots = self
            .forest
            .hold_roots()
            .iter()
            .chain(self.forest.combo_roots().iter());
        for (key, &node) in roots {
            if frame.is_down(key)
                && !satisfied.contains(&node)
                && matches!(evaluate(self.forest.node(node), frame), NodeOutcome::Matched)
            {
                satisfied.push(node);
            }
        }

        let mut matches = Vec::new();
        for node in satisfied {
            self.complete_node(node, frame, &mut matches, &mut survivors);
        }

        self.partials = survivors;
        matches
    }

    /// Handle a satisfied node: bump confidence, emit the best completed
    /// pattern, and advance the rest into their child branches.
    fn complete_node(
        &mut self,
        id: NodeId,
        frame: &KeyFrame,
        matches: &mut Vec<PatternMatch>,
        survivors: &mut Vec<PartialMatch>,
    ) {
        let (winner, children) = {
            let node = &mut self.forest.nodes[id];
            for pattern in node.patterns.iter_mut() {
                pattern.confidence += 1.0;
            }
            // The list is sorted descending by priority (stable), so the
            // first zero-remaining pattern is the emitted match.
            let winner = node
                .patterns
                .iter()
                .find(|p| p.remaining_steps.is_empty())
                .map(|p| PatternMatch {
                    id: p.id.clone(),
                    action: p.action.clone(),
                    priority: p.priority,
                    confidence: p.confidence,
                });

            let mut children = Vec::new();
            for pattern in &node.patterns {
                let Some(next) = pattern.remaining_steps.first() else {
                    continue;
                };
                let Some(key) = next.keys.first() else { continue };
                if let Some(&child) = node.children.get(key) {
                    if !children.contains(&child) {
                        children.push(child);
                    }
                }
            }
            (winner, children)
        };

        if let Some(m) = winner {
            matches.push(m);
        }

        for child in children {
            let deadline = self
                .forest
                .node(child)
                .conditions
                .window()
                .map(|w| frame.timestamp + w);
            match survivors.iter_mut().find(|p| p.node == child) {
                Some(existing) => existing.deadline = deadline,
                None => survivors.push(PartialMatch { node: child, deadline }),
            }
        }
    }
}

fn evaluate(node: &PatternNode, frame: &KeyFrame) -> NodeOutcome {
    // Releasing one of the step's keys kills a strict branch immediately.
    if node.conditions.strict && node.keys.iter().any(|k| frame.released.contains(k)) {
        return NodeOutcome::Invalidated;
    }

    match node.kind {
        StepKind::Hold => {
            let required = node.conditions.hold_time().unwrap_or(Duration::ZERO);
            let all_held = node
                .keys
                .iter()
                .all(|k| frame.is_down(k) && frame.hold_duration(k) >= required);
            if !all_held {
                return NodeOutcome::Pending;
            }
            if node.conditions.strict && has_extraneous(node, frame) {
                return NodeOutcome::Invalidated;
            }
            NodeOutcome::Matched
        }
        StepKind::Combo => {
            if !node.keys.iter().all(|k| frame.is_down(k)) {
                return NodeOutcome::Pending;
            }
            if let Some(window) = node.conditions.window() {
                // All keys must have gone down within `window` of the first
                // of them; the spread of hold durations measures that.
                let mut earliest = Duration::ZERO;
                let mut latest = Duration::MAX;
                for k in &node.keys {
                    let d = frame.hold_duration(k);
                    earliest = earliest.max(d);
                    latest = latest.min(d);
                }
                if earliest - latest > window {
                    return NodeOutcome::Invalidated;
                }
            }
            if node.conditions.strict && has_extraneous(node, frame) {
                return NodeOutcome::Invalidated;
            }
            NodeOutcome::Matched
        }
        // Press/Release/Single never materialize as nodes.
        _ => NodeOutcome::Invalidated,
    }
}

fn has_extraneous(node: &PatternNode, frame: &KeyFrame) -> bool {
    frame.down_keys().any(|k| !node.keys.contains(k))
}
