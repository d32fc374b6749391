// crates/argrule-core/src/validator.rs
// ============================================================================
// Module: Tree Evaluator
// Description: Walks a compiled rule's groups and combines leaf outcomes.
// Purpose: Decide overall validity and pick the captured value or collect
//          every failure reason.
// Dependencies: serde, serde_json, crate::{compiler, engine, error, leaf, value}
// ============================================================================

//! ## Overview
//! Groups are visited in order and the rule is valid when every group passes.
//! Each leaf is evaluated at most once per call. A group reduces only over the
//! leaves it evaluates itself: in `a || b && c` the second group shares `b`
//! with the first, so it is decided by `c` alone and `a` can still satisfy
//! the first group.
//!
//! A successful leaf supplies the result value when it is the captured leaf,
//! or when nothing has been captured yet. Failure reasons accumulate in leaf
//! evaluation order; only [`RuleError::InvalidData`] becomes a reason, every
//! other error aborts the call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::compiler::CompiledRule;
use crate::compiler::Connective;
use crate::compiler::Group;
use crate::compiler::Leaf;
use crate::engine::EvalScope;
use crate::error::RuleError;
use crate::error::RuleResult;
use crate::leaf::evaluate_leaf;
use crate::value::Input;

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Result of validating an input against a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// The input satisfied the rule; carries the captured value.
    Valid(Value),
    /// The input failed; carries one reason per failed leaf.
    Invalid(Vec<String>),
}

impl ValidationOutcome {
    /// Returns true for [`ValidationOutcome::Valid`].
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Returns the captured value when valid.
    #[must_use]
    pub const fn value(&self) -> Option<&Value> {
        match self {
            Self::Valid(value) => Some(value),
            Self::Invalid(_) => None,
        }
    }

    /// Returns the failure reasons (empty when valid).
    #[must_use]
    pub fn errors(&self) -> &[String] {
        match self {
            Self::Valid(_) => &[],
            Self::Invalid(errors) => errors,
        }
    }

    /// Converts into a `Result`, valid value first.
    ///
    /// # Errors
    /// Returns the failure reasons when invalid.
    pub fn into_result(self) -> Result<Value, Vec<String>> {
        match self {
            Self::Valid(value) => Ok(value),
            Self::Invalid(errors) => Err(errors),
        }
    }
}

// ============================================================================
// SECTION: Evaluation State
// ============================================================================

/// Per-call evaluation state; dropped when the call returns.
struct TreeWalk<'s, 'r> {
    /// Engine access and caller context.
    scope: &'s EvalScope<'s>,
    /// Rule being evaluated.
    rule: &'r CompiledRule,
    /// Input shared by every leaf.
    input: Input<'s>,
    /// Leaves already evaluated, indexed like `rule.leaves()`.
    checked: Vec<bool>,
    /// Value selected for the result so far.
    captured: Option<Value>,
    /// Failure reasons in evaluation order.
    errors: Vec<String>,
}

impl<'s, 'r> TreeWalk<'s, 'r> {
    /// Creates empty state for one call.
    fn new(scope: &'s EvalScope<'s>, rule: &'r CompiledRule, input: Input<'s>) -> Self {
        Self {
            scope,
            rule,
            input,
            checked: vec![false; rule.leaves().len()],
            captured: None,
            errors: Vec::new(),
        }
    }

    /// Returns true when leaf `index` was evaluated by an earlier group.
    fn already_checked(&self, index: usize) -> bool {
        self.checked.get(index).copied().unwrap_or(false)
    }

    /// Evaluates leaf `index`, records its reasons or value, and returns
    /// whether it passed.
    fn check_leaf(&mut self, index: usize) -> RuleResult<bool> {
        let passed = match self.rule.leaf(index) {
            Some(Leaf::Check(text)) => match evaluate_leaf(self.scope, text, self.input) {
                Ok(value) => Some(value),
                Err(RuleError::InvalidData(reason)) => {
                    self.errors.push(reason);
                    None
                }
                Err(other) => return Err(other),
            },
            Some(Leaf::Nested(nested)) => match validate(self.scope, nested, self.input)? {
                ValidationOutcome::Valid(value) => Some(value),
                ValidationOutcome::Invalid(reasons) => {
                    self.errors.extend(reasons);
                    None
                }
            },
            None => {
                return Err(RuleError::invalid_rule(format!(
                    "group references missing leaf {index}"
                )));
            }
        };

        if let Some(slot) = self.checked.get_mut(index) {
            *slot = true;
        }
        let Some(value) = passed else {
            return Ok(false);
        };
        if self.rule.capture() == Some(index) || self.captured.is_none() {
            self.captured = Some(value);
        }
        Ok(true)
    }

    /// Evaluates one group over the leaves it checks itself.
    ///
    /// A leaf already checked by an earlier group does not count again; its
    /// result was folded into that group. A group with nothing new to check
    /// contributes no result.
    fn group_result(&mut self, group: &Group) -> RuleResult<Option<bool>> {
        let (connective, indices) = match group {
            Group::Solo {
                leaf,
            } => (Connective::And, std::slice::from_ref(leaf)),
            Group::Combine {
                connective,
                leaves,
            } => (*connective, leaves.as_slice()),
        };

        let mut results = Vec::with_capacity(indices.len());
        for index in indices {
            if !self.already_checked(*index) {
                results.push(self.check_leaf(*index)?);
            }
        }
        if results.is_empty() {
            return Ok(None);
        }
        Ok(Some(match connective {
            Connective::And => results.iter().all(|passed| *passed),
            Connective::Or => results.iter().any(|passed| *passed),
        }))
    }

    /// Walks every group and builds the outcome.
    fn run(mut self) -> RuleResult<ValidationOutcome> {
        let mut all_passed = true;
        for group in self.rule.groups() {
            if let Some(passed) = self.group_result(group)? {
                all_passed &= passed;
            }
        }
        if all_passed {
            Ok(ValidationOutcome::Valid(self.captured.unwrap_or(Value::Null)))
        } else {
            Ok(ValidationOutcome::Invalid(self.errors))
        }
    }
}

// ============================================================================
// SECTION: Public API
// ============================================================================

/// Validates `input` against a compiled rule.
///
/// # Errors
/// Returns [`RuleError::InvalidRule`] or [`RuleError::MissingData`] when the
/// rule cannot be evaluated; input failures are reported in the outcome.
pub fn validate(
    scope: &EvalScope<'_>,
    rule: &CompiledRule,
    input: Input<'_>,
) -> RuleResult<ValidationOutcome> {
    TreeWalk::new(scope, rule, input).run()
}
