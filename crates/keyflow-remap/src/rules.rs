//! Remap rule validation and chain resolution.

use crate::error::{RemapError, ValidationReport};
use keyflow_keys::{is_valid_key, Key};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Maximum number of hops a resolved remap chain may take.
pub const MAX_CHAIN_DEPTH: usize = 5;

/// A raw remap document: source key name to ordered target names.
///
/// The whole document is replaced atomically on reconfiguration; individual
/// rules have no independent lifetime.
pub type RemapDoc = HashMap<String, Vec<String>>;

/// Validate a remap document with the default chain depth.
pub fn validate(doc: &RemapDoc) -> ValidationReport {
    validate_with_depth(doc, MAX_CHAIN_DEPTH)
}

/// Validate a remap document, collecting every applicable finding.
///
/// Basic checks (unknown names, self-reference) run per rule; chain checks
/// then traverse from every rule's source key, with the visited set scoped to
/// that traversal. No check short-circuits another.
pub fn validate_with_depth(doc: &RemapDoc, max_depth: usize) -> ValidationReport {
    let mut report = ValidationReport::new();

    for (from, targets) in doc {
        if !is_valid_key(from) {
            report.push(RemapError::InvalidKey {
                rule: from.clone(),
                name: from.clone(),
            });
        }
        for target in targets {
            if !is_valid_key(target) {
                report.push(RemapError::InvalidKey {
                    rule: from.clone(),
                    name: target.clone(),
                });
            }
        }
        if targets.iter().any(|t| canon(t) == canon(from)) {
            report.push(RemapError::SelfReference { key: from.clone() });
        }
    }

    // Chain checks run over canonical names; alias spellings of one key
    // count as the same key.
    let index: HashMap<String, &Vec<String>> = doc
        .iter()
        .map(|(from, targets)| (canon(from), targets))
        .collect();
    let mut roots: Vec<&String> = index.keys().collect();
    roots.sort();

    for root in roots {
        let mut path = Vec::new();
        walk(&index, root, &mut path, max_depth, &mut report);
    }

    report
}

/// True iff `validate` finds nothing.
pub fn is_valid(doc: &RemapDoc) -> bool {
    validate(doc).is_valid()
}

fn canon(name: &str) -> String {
    match Key::parse(name) {
        Ok(key) => key.as_str().to_string(),
        Err(_) => name.to_string(),
    }
}

fn walk(
    index: &HashMap<String, &Vec<String>>,
    key: &str,
    path: &mut Vec<String>,
    max_depth: usize,
    report: &mut ValidationReport,
) {
    if path.iter().any(|seen| seen == key) {
        let mut chain = path.clone();
        chain.push(key.to_string());
        report.push(RemapError::Circular { chain });
        return;
    }
    if path.len() > max_depth {
        report.push(RemapError::ChainLength {
            start: path[0].clone(),
            max_depth,
        });
        return;
    }
    path.push(key.to_string());
    if let Some(targets) = index.get(key) {
        for target in targets.iter() {
            walk(index, &canon(target), path, max_depth, report);
        }
    }
    path.pop();
}

/// A validated-or-not set of remap rules keyed by source key.
///
/// Construction via [`RemapRules::from_doc`] enforces a clean validation
/// report; [`RemapRules::new`] accepts anything, because resolution is
/// independently cycle- and depth-guarded and must never hang even on rules
/// validation would reject.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemapRules {
    rules: HashMap<Key, Vec<Key>>,
}

impl RemapRules {
    /// Wrap an already-typed rule map without validating it.
    pub fn new(rules: HashMap<Key, Vec<Key>>) -> Self {
        Self { rules }
    }

    /// Build typed rules from a raw document, rejecting the whole document
    /// when validation finds any error.
    pub fn from_doc(doc: &RemapDoc) -> Result<Self, ValidationReport> {
        let report = validate(doc);
        if !report.is_valid() {
            return Err(report);
        }
        let mut rules = HashMap::new();
        for (from, targets) in doc {
            let Ok(from) = Key::parse(from) else { continue };
            let targets: Vec<Key> = targets.iter().filter_map(|t| Key::parse(t).ok()).collect();
            rules.insert(from, targets);
        }
        Ok(Self { rules })
    }

    /// The ordered targets for a source key, if a rule exists.
    pub fn get(&self, key: &Key) -> Option<&[Key]> {
        self.rules.get(key).map(Vec::as_slice)
    }

    /// Whether a rule exists for this source key.
    pub fn contains(&self, key: &Key) -> bool {
        self.rules.contains_key(key)
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no rules are configured.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The transitive closure of keys reachable from `source`, excluding the
    /// source itself and bounded by `max_depth` hops.
    ///
    /// Already-visited keys are skipped rather than reported, so this
    /// terminates on cyclic rules.
    pub fn resolve_chain(&self, source: Key, max_depth: usize) -> BTreeSet<Key> {
        let mut reachable = BTreeSet::new();
        let mut visited = HashSet::from([source]);
        let mut frontier = vec![(source, 0usize)];

        while let Some((key, depth)) = frontier.pop() {
            if depth >= max_depth {
                continue;
            }
            if let Some(targets) = self.rules.get(&key) {
                for &target in targets {
                    if visited.insert(target) {
                        reachable.insert(target);
                        frontier.push((target, depth + 1));
                    }
                }
            }
        }

        reachable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> Key {
        Key::parse(name).unwrap()
    }

    fn doc(rules: &[(&str, &[&str])]) -> RemapDoc {
        rules
            .iter()
            .map(|(from, to)| {
                (
                    from.to_string(),
                    to.iter().map(|t| t.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_clean_rules_validate_empty() {
        let doc = doc(&[("CapsLock", &["LeftCtrl"]), ("A", &["B", "C"])]);
        let report = validate(&doc);
        assert!(report.is_valid(), "unexpected errors: {report}");
        assert!(is_valid(&doc));
    }

    #[test]
    fn test_invalid_key_reported_for_from_and_to() {
        let doc = doc(&[("Hyper", &["A"]), ("B", &["Bogus"])]);
        let report = validate(&doc);
        assert!(report.errors().contains(&RemapError::InvalidKey {
            rule: "Hyper".to_string(),
            name: "Hyper".to_string(),
        }));
        assert!(report.errors().contains(&RemapError::InvalidKey {
            rule: "B".to_string(),
            name: "Bogus".to_string(),
        }));
    }

    #[test]
    fn test_self_reference() {
        let doc = doc(&[("A", &["A"])]);
        let report = validate(&doc);
        assert!(report.errors().contains(&RemapError::SelfReference {
            key: "A".to_string(),
        }));
    }

    #[test]
    fn test_self_reference_through_alias() {
        let doc = doc(&[("ctrl", &["LeftCtrl"])]);
        let report = validate(&doc);
        assert!(report.errors().contains(&RemapError::SelfReference {
            key: "ctrl".to_string(),
        }));
    }

    #[test]
    fn test_two_rule_cycle() {
        let doc = doc(&[("A", &["B"]), ("B", &["A"])]);
        let report = validate(&doc);

        let cycles: Vec<_> = report
            .errors()
            .iter()
            .filter_map(|e| match e {
                RemapError::Circular { chain } => Some(chain),
                _ => None,
            })
            .collect();
        assert!(!cycles.is_empty());
        assert!(cycles
            .iter()
            .any(|chain| chain.contains(&"A".to_string()) && chain.contains(&"B".to_string())));
    }

    #[test]
    fn test_chain_length_exceeded() {
        // A -> B -> C -> D -> E -> F -> G: six hops from A, one over the bound.
        let doc = doc(&[
            ("A", &["B"]),
            ("B", &["C"]),
            ("C", &["D"]),
            ("D", &["E"]),
            ("E", &["F"]),
            ("F", &["G"]),
        ]);
        let report = validate(&doc);
        assert!(report.errors().contains(&RemapError::ChainLength {
            start: "A".to_string(),
            max_depth: MAX_CHAIN_DEPTH,
        }));
        // The chain starting one hop in stays within the bound.
        assert!(!report.errors().contains(&RemapError::ChainLength {
            start: "B".to_string(),
            max_depth: MAX_CHAIN_DEPTH,
        }));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let doc = doc(&[("A", &["B", "C"]), ("B", &["D"]), ("C", &["D"])]);
        let report = validate(&doc);
        assert!(report.is_valid(), "unexpected errors: {report}");
    }

    #[test]
    fn test_resolve_chain_transitive() {
        let rules = RemapRules::from_doc(&doc(&[("A", &["B"]), ("B", &["C", "D"])])).unwrap();
        let reached = rules.resolve_chain(key("A"), MAX_CHAIN_DEPTH);
        let expected: BTreeSet<Key> = [key("B"), key("C"), key("D")].into();
        assert_eq!(reached, expected);
    }

    #[test]
    fn test_resolve_chain_excludes_source_and_tolerates_cycles() {
        let rules = RemapRules::new(HashMap::from([
            (key("A"), vec![key("B")]),
            (key("B"), vec![key("A")]),
        ]));
        let reached = rules.resolve_chain(key("A"), MAX_CHAIN_DEPTH);
        let expected: BTreeSet<Key> = [key("B")].into();
        assert_eq!(reached, expected);
    }

    #[test]
    fn test_resolve_chain_depth_bound() {
        let rules = RemapRules::from_doc(&doc(&[
            ("A", &["B"]),
            ("B", &["C"]),
            ("C", &["D"]),
        ]))
        .unwrap();
        let reached = rules.resolve_chain(key("A"), 2);
        let expected: BTreeSet<Key> = [key("B"), key("C")].into();
        assert_eq!(reached, expected);
    }

    #[test]
    fn test_resolve_unmapped_key_is_empty() {
        let rules = RemapRules::default();
        assert!(rules.resolve_chain(key("A"), MAX_CHAIN_DEPTH).is_empty());
    }

    #[test]
    fn test_from_doc_rejects_invalid() {
        let report = RemapRules::from_doc(&doc(&[("A", &["A"])])).unwrap_err();
        assert!(!report.is_valid());
    }
}
