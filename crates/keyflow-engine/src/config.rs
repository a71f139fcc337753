//! Whole-document engine configuration.

use keyflow_patterns::ShortcutDefinition;
use keyflow_queue::QueueConfig;
use keyflow_remap::ValidationReport;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The full configuration document.
///
/// Configuration arrives as whole-document replacements from the persistence
/// collaborator; each replacement is validated and applied atomically. A
/// rejected document leaves the previous rules and forest in effect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Remap rules: source key name to ordered target names.
    #[serde(default)]
    pub remaps: HashMap<String, Vec<String>>,
    /// Shortcut definitions compiled into the pattern forest.
    #[serde(default)]
    pub shortcuts: Vec<ShortcutDefinition>,
    /// Task queue tunables.
    #[serde(default)]
    pub queue: QueueConfig,
}

impl EngineConfig {
    /// Parse a TOML configuration document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

/// Why a configuration document was not applied.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document does not parse.
    #[error("invalid config document: {0}")]
    Parse(#[from] toml::de::Error),

    /// The remap rules failed validation; the report carries every finding.
    #[error("remap rules rejected:\n{0}")]
    InvalidRemaps(ValidationReport),
}
