//! Metadata values and the "unavailable" sentinel.
//!
//! Tools report missing information in many ways (absent keys, empty
//! strings, `None`, the literal `(:unav)`). Internally every one of them is
//! [`Value::Unavailable`]; the `(:unav)` placeholder only reappears when a
//! value is displayed or serialized.

use serde::{Serialize, Serializer};
use std::fmt;

/// Placeholder written for values that could not be resolved.
pub const UNAV: &str = "(:unav)";

/// A single metadata value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Value {
    /// A resolved value. Numbers are carried as their string form.
    Known(String),
    /// Nothing could be resolved for this field.
    #[default]
    Unavailable,
}

impl Value {
    /// Build a value from a string, mapping the `(:unav)` placeholder to
    /// [`Value::Unavailable`].
    pub fn new(s: impl Into<String>) -> Self {
        let s = s.into();
        if s == UNAV {
            Value::Unavailable
        } else {
            Value::Known(s)
        }
    }

    /// Build a value from an optional string.
    pub fn from_option<S: Into<String>>(opt: Option<S>) -> Self {
        opt.map(Value::new).unwrap_or(Value::Unavailable)
    }

    /// Returns `true` for [`Value::Unavailable`].
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Unavailable)
    }

    /// The resolved string, if any.
    pub fn known(&self) -> Option<&str> {
        match self {
            Value::Known(s) => Some(s),
            Value::Unavailable => None,
        }
    }

    /// The external representation: the value itself or `(:unav)`.
    pub fn as_str(&self) -> &str {
        match self {
            Value::Known(s) => s,
            Value::Unavailable => UNAV,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::new(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::new(s)
    }
}

impl From<Option<String>> for Value {
    fn from(opt: Option<String>) -> Self {
        Value::from_option(opt)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Result of a metadata accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// The accessor applies to this stream.
    Present(Value),
    /// The accessor does not apply to this stream type; the field is left
    /// out of the record entirely.
    NotApplicable,
}

impl Field {
    /// Shorthand for a present, resolved value.
    pub fn known(s: impl Into<String>) -> Self {
        Field::Present(Value::new(s))
    }

    /// Shorthand for a present but unresolved value.
    pub fn unavailable() -> Self {
        Field::Present(Value::Unavailable)
    }

    /// Yields `NotApplicable` unless `applies` holds, otherwise `value()`.
    pub fn when(applies: bool, value: impl FnOnce() -> Value) -> Self {
        if applies {
            Field::Present(value())
        } else {
            Field::NotApplicable
        }
    }
}

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        Field::Present(value)
    }
}
