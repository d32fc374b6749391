// crates/argrule-core/src/value.rs
// ============================================================================
// Module: Rule Values
// Description: Runtime value model shared by converters, functions, and callers.
// Purpose: Classify JSON values into type tags and carry evaluation inputs.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Rule evaluation operates on [`serde_json::Value`]. This module adds the
//! [`ValueKind`] type tags used by `valid_types`, required context checks and
//! argument specs, plus the [`Input`] wrapper that distinguishes raw text from
//! already-typed values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Context
// ============================================================================

/// Caller-supplied key/value data available to converters and functions.
pub type Context = BTreeMap<String, Value>;

// ============================================================================
// SECTION: Value Kinds
// ============================================================================

/// Runtime type tag for a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// JSON null.
    Null,
    /// Boolean.
    Bool,
    /// Number representable as `i64` or `u64`.
    Integer,
    /// Any other number.
    Float,
    /// String.
    String,
    /// Array.
    Array,
    /// Object / mapping.
    Map,
}

impl ValueKind {
    /// Classifies a value.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(number) => {
                if number.is_i64() || number.is_u64() {
                    Self::Integer
                } else {
                    Self::Float
                }
            }
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Map,
        }
    }

    /// Returns the lowercase label used in diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Array => "array",
            Self::Map => "map",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SECTION: Evaluation Input
// ============================================================================

/// Input handed to a rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input<'a> {
    /// Raw text; every leaf runs its type's converter.
    Raw(&'a str),
    /// Already-typed value; converters are skipped and the kind is checked.
    Typed(&'a Value),
}

impl Input<'_> {
    /// Returns the mode label used in audit events.
    #[must_use]
    pub const fn mode(&self) -> &'static str {
        match self {
            Self::Raw(_) => "raw",
            Self::Typed(_) => "typed",
        }
    }
}

/// Renders a value the way rule messages and the default formatter show it.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
