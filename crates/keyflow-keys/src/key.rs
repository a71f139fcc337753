//! The interned logical key type.

use crate::vocabulary;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A name that does not belong to the key vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key name: '{0}'")]
pub struct InvalidKeyError(pub String);

/// A logical key, interned against the closed vocabulary.
///
/// `Key` is a thin wrapper over the canonical `'static` name, so it is `Copy`
/// and comparisons are plain string comparisons. The only way to obtain one
/// is through [`Key::parse`], which canonicalizes case and aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(&'static str);

impl Key {
    /// Parse a key name, accepting canonical names and aliases in any case.
    pub fn parse(name: &str) -> Result<Self, InvalidKeyError> {
        vocabulary::lookup(name)
            .map(Key)
            .ok_or_else(|| InvalidKeyError(name.to_string()))
    }

    /// The canonical name of this key.
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Key {
    type Err = InvalidKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::parse(s)
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Key::parse(&name).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonicalizes() {
        let key = Key::parse("capslock").unwrap();
        assert_eq!(key.as_str(), "CapsLock");

        let key = Key::parse("esc").unwrap();
        assert_eq!(key.as_str(), "Escape");
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = Key::parse("Hyper").unwrap_err();
        assert_eq!(err, InvalidKeyError("Hyper".to_string()));
    }

    #[test]
    fn test_alias_and_canonical_compare_equal() {
        let a = Key::parse("ctrl").unwrap();
        let b = Key::parse("LeftCtrl").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_display() {
        assert_eq!(Key::parse("pgup").unwrap().to_string(), "PageUp");
    }

    #[test]
    fn test_serde_round_trip() {
        let key = Key::parse("NumpadAdd").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"NumpadAdd\"");

        let back: Key = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_serde_rejects_unknown() {
        let result: Result<Key, _> = serde_json::from_str("\"NotAKey\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_serde_canonicalizes_aliases() {
        let key: Key = serde_json::from_str("\"ctrl\"").unwrap();
        assert_eq!(key.as_str(), "LeftCtrl");
    }
}
