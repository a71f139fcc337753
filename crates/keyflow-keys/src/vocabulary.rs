//! The closed vocabulary of logical key names.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Every canonical key name the engine understands.
///
/// The set is closed: remap rules and shortcut definitions that reference a
/// name outside this table are rejected during validation rather than
/// silently ignored.
static CANONICAL: &[&str] = &[
    // Letters
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R",
    "S", "T", "U", "V", "W", "X", "Y", "Z",
    // Digits
    "0", "1", "2", "3", "4", "5", "6", "7", "8", "9",
    // Function keys
    "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12", "F13", "F14",
    "F15", "F16", "F17", "F18", "F19", "F20", "F21", "F22", "F23", "F24",
    // Navigation and editing
    "Up", "Down", "Left", "Right", "Home", "End", "PageUp", "PageDown", "Insert", "Delete",
    "Backspace", "Tab", "Enter", "Escape", "Space", "CapsLock", "PrintScreen", "ScrollLock",
    "Pause", "Menu",
    // Modifier variants (left and right are distinct keys)
    "LeftShift", "RightShift", "LeftCtrl", "RightCtrl", "LeftAlt", "RightAlt", "LeftMeta",
    "RightMeta",
    // Numpad
    "Numpad0", "Numpad1", "Numpad2", "Numpad3", "Numpad4", "Numpad5", "Numpad6", "Numpad7",
    "Numpad8", "Numpad9", "NumpadAdd", "NumpadSubtract", "NumpadMultiply", "NumpadDivide",
    "NumpadDecimal", "NumpadEnter", "NumLock",
    // Punctuation
    "Minus", "Equal", "LeftBracket", "RightBracket", "Backslash", "Semicolon", "Apostrophe",
    "Grave", "Comma", "Period", "Slash",
];

/// Alternate spellings accepted by the parser, mapped to canonical names.
static ALIASES: &[(&str, &str)] = &[
    ("esc", "Escape"),
    ("return", "Enter"),
    ("cr", "Enter"),
    ("del", "Delete"),
    ("ins", "Insert"),
    ("bs", "Backspace"),
    ("pgup", "PageUp"),
    ("pgdn", "PageDown"),
    ("pgdown", "PageDown"),
    ("spacebar", "Space"),
    ("caps", "CapsLock"),
    ("prtsc", "PrintScreen"),
    // Bare modifier names resolve to the left-hand variant
    ("ctrl", "LeftCtrl"),
    ("control", "LeftCtrl"),
    ("shift", "LeftShift"),
    ("alt", "LeftAlt"),
    ("option", "LeftAlt"),
    ("meta", "LeftMeta"),
    ("super", "LeftMeta"),
    ("cmd", "LeftMeta"),
    ("command", "LeftMeta"),
    ("win", "LeftMeta"),
];

fn index() -> &'static HashMap<String, &'static str> {
    static INDEX: OnceLock<HashMap<String, &'static str>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut map = HashMap::new();
        for &name in CANONICAL {
            map.insert(name.to_ascii_lowercase(), name);
        }
        for &(alias, canonical) in ALIASES {
            map.insert(alias.to_string(), canonical);
        }
        map
    })
}

/// Look up a name (canonical or alias, any case) and return its canonical form.
pub(crate) fn lookup(name: &str) -> Option<&'static str> {
    index().get(&name.trim().to_ascii_lowercase()).copied()
}

/// Check whether a name refers to a key in the vocabulary.
pub fn is_valid_key(name: &str) -> bool {
    lookup(name).is_some()
}

/// All canonical key names, in declaration order.
pub fn all_keys() -> &'static [&'static str] {
    CANONICAL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names_valid() {
        for name in all_keys() {
            assert!(is_valid_key(name), "{name} should be valid");
        }
    }

    #[test]
    fn test_case_insensitive() {
        assert!(is_valid_key("capslock"));
        assert!(is_valid_key("CAPSLOCK"));
        assert!(is_valid_key("CapsLock"));
    }

    #[test]
    fn test_aliases() {
        assert_eq!(lookup("esc"), Some("Escape"));
        assert_eq!(lookup("pgup"), Some("PageUp"));
        assert_eq!(lookup("ctrl"), Some("LeftCtrl"));
    }

    #[test]
    fn test_unknown_names() {
        assert!(!is_valid_key("Hyper"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("CapsLock2"));
    }

    #[test]
    fn test_no_duplicate_canonical_names() {
        let mut seen = std::collections::HashSet::new();
        for name in all_keys() {
            assert!(seen.insert(name.to_ascii_lowercase()), "duplicate: {name}");
        }
    }
}
