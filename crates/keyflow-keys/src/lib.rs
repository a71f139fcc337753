//! # keyflow-keys
//!
//! The logical key vocabulary for the keyflow engine.
//!
//! Every other component validates key references against this closed set:
//! letters, digits, function keys, navigation and editing keys, left/right
//! modifier variants, numpad keys, and punctuation. Key identity is an
//! interned canonical name, independent of hardware scan codes; translating
//! raw codes into names is the input collaborator's job.

mod key;
mod vocabulary;

pub use key::{InvalidKeyError, Key};
pub use vocabulary::{all_keys, is_valid_key};
