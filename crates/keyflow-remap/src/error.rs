//! Remap validation errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single finding from remap validation.
///
/// Errors reference keys by name rather than by [`keyflow_keys::Key`] because
/// validation runs over raw configuration documents, where names may not be
/// part of the vocabulary at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum RemapError {
    /// A rule references a name outside the key vocabulary.
    #[error("rule '{rule}' references unknown key '{name}'")]
    InvalidKey { rule: String, name: String },

    /// A rule maps a key to itself.
    #[error("key '{key}' is remapped to itself")]
    SelfReference { key: String },

    /// Following remap targets revisits a key already on the chain.
    #[error("remap chain forms a cycle: {}", .chain.join(" -> "))]
    Circular { chain: Vec<String> },

    /// A chain descends deeper than the configured maximum.
    #[error("remap chain starting at '{start}' exceeds the maximum depth of {max_depth}")]
    ChainLength { start: String, max_depth: usize },
}

/// All findings from validating a remap document.
///
/// Validation never aborts early: every rule is checked and a single rule may
/// contribute several entries. The report is returned as data so the caller
/// decides whether to apply the configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    errors: Vec<RemapError>,
}

impl ValidationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a finding to the report.
    pub fn push(&mut self, error: RemapError) {
        self.errors.push(error);
    }

    /// True when validation found nothing.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// All findings, in discovery order.
    pub fn errors(&self) -> &[RemapError] {
        &self.errors
    }

    /// Number of findings.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when the report holds no findings.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Consume the report, yielding its findings.
    pub fn into_errors(self) -> Vec<RemapError> {
        self.errors
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return write!(f, "no remap errors");
        }
        for error in &self.errors {
            writeln!(f, "- {}", error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report() {
        let report = ValidationReport::new();
        assert!(report.is_valid());
        assert_eq!(report.to_string(), "no remap errors");
    }

    #[test]
    fn test_report_display() {
        let mut report = ValidationReport::new();
        report.push(RemapError::SelfReference {
            key: "A".to_string(),
        });
        report.push(RemapError::Circular {
            chain: vec!["A".to_string(), "B".to_string(), "A".to_string()],
        });

        let display = report.to_string();
        assert!(display.contains("remapped to itself"));
        assert!(display.contains("A -> B -> A"));
        assert!(!report.is_valid());
        assert_eq!(report.len(), 2);
    }
}
