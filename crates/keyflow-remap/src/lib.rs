//! # keyflow-remap
//!
//! Validation and resolution of key-remap rules.
//!
//! Remaps rewrite a physical key press into zero or more logical keys before
//! any pattern matching happens. An unbounded or cyclic expansion would hang
//! or flood everything downstream, so the two halves of this crate guard
//! independently:
//!
//! - [`validate`] checks a raw remap document for unknown keys,
//!   self-references, cycles, and over-long chains, collecting every finding
//!   into a [`ValidationReport`] returned as data.
//! - [`RemapRules::resolve_chain`] expands the transitive closure of a source
//!   key with its own depth bound and cycle tolerance, whether or not the
//!   rules ever passed validation.

mod error;
mod rules;

pub use error::{RemapError, ValidationReport};
pub use rules::{is_valid, validate, validate_with_depth, RemapDoc, RemapRules, MAX_CHAIN_DEPTH};
