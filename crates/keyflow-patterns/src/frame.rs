//! Per-frame key state delivered by the input collaborator.

use keyflow_keys::Key;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// One frame of key state: edges, held keys, and per-key hold durations.
///
/// Frames arrive as an ordered stream from the external keyboard hook; the
/// matcher never reads hardware input itself.
#[derive(Debug, Clone)]
pub struct KeyFrame {
    /// Keys that went down this frame.
    pub pressed: HashSet<Key>,
    /// Keys held down (including those pressed earlier).
    pub held: HashSet<Key>,
    /// Keys that went up this frame.
    pub released: HashSet<Key>,
    /// How long each down key has been held continuously.
    pub hold_durations: HashMap<Key, Duration>,
    /// When this frame was observed.
    pub timestamp: Instant,
}

impl KeyFrame {
    /// A frame with no key activity.
    pub fn empty(timestamp: Instant) -> Self {
        Self {
            pressed: HashSet::new(),
            held: HashSet::new(),
            released: HashSet::new(),
            hold_durations: HashMap::new(),
            timestamp,
        }
    }

    /// Add a key that went down this frame.
    pub fn with_pressed(mut self, key: Key) -> Self {
        self.pressed.insert(key);
        self
    }

    /// Add a held key with its continuous hold duration.
    pub fn with_held(mut self, key: Key, duration: Duration) -> Self {
        self.held.insert(key);
        self.hold_durations.insert(key, duration);
        self
    }

    /// Add a key that went up this frame.
    pub fn with_released(mut self, key: Key) -> Self {
        self.released.insert(key);
        self
    }

    /// True when no key is pressed or held.
    pub fn is_idle(&self) -> bool {
        self.pressed.is_empty() && self.held.is_empty()
    }

    /// Whether a key is currently down (newly pressed or held).
    pub fn is_down(&self, key: &Key) -> bool {
        self.pressed.contains(key) || self.held.contains(key)
    }

    /// The continuous hold duration for a key; zero when just pressed.
    pub fn hold_duration(&self, key: &Key) -> Duration {
        self.hold_durations.get(key).copied().unwrap_or_default()
    }

    /// All keys currently down.
    pub fn down_keys(&self) -> impl Iterator<Item = &Key> {
        self.pressed.union(&self.held)
    }
}
