// crates/argrule-core/src/error.rs
// ============================================================================
// Module: Rule Error Definitions
// Description: Structured diagnostics for rule compilation and evaluation.
// Purpose: Separate rule-authoring bugs, integration bugs, and data failures.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Two layers of errors live here. [`CompileError`] carries positioned
//! diagnostics for malformed rule text. [`RuleError`] is the taxonomy every
//! public operation returns:
//!
//! - [`RuleError::InvalidRule`]: the rule text is wrong. Fatal for the call.
//! - [`RuleError::MissingData`]: context or argument data is absent or has the
//!   wrong type. Fatal for the call.
//! - [`RuleError::InvalidData`]: the input failed a converter or a function.
//!   Caught at the leaf boundary and turned into a failure reason.

use thiserror::Error;

// ============================================================================
// SECTION: Compile Errors
// ============================================================================

/// Errors raised while compiling rule text into a tree.
///
/// # Invariants
/// - Positions are byte offsets into the (sub-)expression being compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Input was empty or contained only whitespace.
    #[error("rule is empty")]
    EmptyInput,
    /// Input exceeded the configured size limit.
    #[error("rule exceeds size limit: {actual_bytes} bytes (max {max_bytes})")]
    InputTooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual input length in bytes.
        actual_bytes: usize,
    },
    /// Sub-expressions nested deeper than allowed.
    #[error("rule nesting exceeds limit: depth {actual_depth} (max {max_depth})")]
    NestingTooDeep {
        /// Maximum allowed nesting depth.
        max_depth: usize,
        /// Depth reached when the error occurred.
        actual_depth: usize,
    },
    /// A `(` without a matching `)` or a stray `)`.
    #[error("unbalanced parenthesis at {position}")]
    UnbalancedParenthesis {
        /// Byte offset of the offending character.
        position: usize,
    },
    /// A `[` without a matching `]` or a stray `]`.
    #[error("unbalanced bracket at {position}")]
    UnbalancedBracket {
        /// Byte offset of the offending character.
        position: usize,
    },
    /// A connective with nothing on one of its sides.
    #[error("empty check at {position}")]
    EmptyCheck {
        /// Byte offset where the check was expected.
        position: usize,
    },
    /// More than one `@` capture marker in the same expression.
    #[error("more than one captured check at {position}")]
    MultipleCaptures {
        /// Byte offset of the second marker's check.
        position: usize,
    },
    /// `&&` and `||` mixed without parentheses while the policy denies it.
    #[error("rule mixes `&&` and `||` without parentheses")]
    MixedConnectives,
}

// ============================================================================
// SECTION: Rule Errors
// ============================================================================

/// Errors returned by rule operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// The rule text is malformed or references unknown types or functions.
    #[error("invalid rule: {0}")]
    InvalidRule(String),
    /// Required context or argument data is absent or mistyped.
    #[error("missing data: {0}")]
    MissingData(String),
    /// The input failed validation.
    #[error("{0}")]
    InvalidData(String),
}

impl RuleError {
    /// Creates an invalid rule error.
    pub fn invalid_rule(message: impl Into<String>) -> Self {
        Self::InvalidRule(message.into())
    }

    /// Creates a missing data error.
    pub fn missing_data(message: impl Into<String>) -> Self {
        Self::MissingData(message.into())
    }

    /// Creates an invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }

    /// Returns true when this error is a per-input validation failure.
    #[must_use]
    pub const fn is_invalid_data(&self) -> bool {
        matches!(self, Self::InvalidData(_))
    }
}

impl From<CompileError> for RuleError {
    fn from(error: CompileError) -> Self {
        Self::InvalidRule(error.to_string())
    }
}

// ============================================================================
// SECTION: Result Alias
// ============================================================================

/// Convenient Result type for rule operations.
pub type RuleResult<T = ()> = Result<T, RuleError>;
