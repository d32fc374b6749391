// crates/argrule-core/src/leaf.rs
// ============================================================================
// Module: Leaf Evaluator
// Description: Evaluates a single `type[fn1 & fn2(args)]` check.
// Purpose: Resolve the type, obtain a typed value, and thread it through the
//          check's functions in order.
// Dependencies: serde_json, crate::{check, engine, error, registry, value}
// ============================================================================

//! ## Overview
//! Evaluation of one check runs in a fixed order:
//!
//! 1. Resolve the type in the registry (`InvalidRule` when unknown).
//! 2. Verify the type's required context keys (`MissingData`).
//! 3. Obtain a value: run the converter on raw text, or check the kind of an
//!    already-typed value (`InvalidData` on failure).
//! 4. Apply each function: resolve it (`InvalidRule`), coerce its arguments
//!    (`InvalidRule` on arity, `MissingData` on type), then apply it. A
//!    replacement value becomes the running value; a failure stops the check.

use serde_json::Value;

use crate::check::LeafCheck;
use crate::check::parse_check;
use crate::engine::EvalScope;
use crate::error::RuleError;
use crate::error::RuleResult;
use crate::registry::FunctionDefinition;
use crate::registry::RuleRegistry;
use crate::registry::RuleTypeDefinition;
use crate::value::Input;
use crate::value::ValueKind;

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates one check against `input`.
///
/// # Errors
/// Returns [`RuleError::InvalidRule`] or [`RuleError::MissingData`] for
/// problems with the rule or its data, and [`RuleError::InvalidData`] when
/// the input fails the check.
pub fn evaluate_leaf(scope: &EvalScope<'_>, text: &str, input: Input<'_>) -> RuleResult<Value> {
    let check = parse_check(text)?;
    let rule_type = scope.engine().registry().resolve(&check.type_name)?;

    check_context(scope, rule_type)?;

    let mut value = match input {
        Input::Raw(raw) => rule_type.convert(raw, scope)?,
        Input::Typed(typed) => {
            if !rule_type.accepts_kind(ValueKind::of(typed)) {
                return Err(RuleError::invalid_data(format!(
                    "pre-parsed input is not of a valid type for rule {}",
                    rule_type.name()
                )));
            }
            typed.clone()
        }
    };

    for call in &check.calls {
        let function = resolve_function(rule_type, &call.name)?;
        let args = function.args().coerce(function.name(), &call.args)?;
        if let Some(next) = function.apply(&value, &args, scope)? {
            value = next;
        }
    }

    Ok(value)
}

/// Looks up a function on a type, failing with [`RuleError::InvalidRule`].
fn resolve_function<'r>(
    rule_type: &'r RuleTypeDefinition,
    name: &str,
) -> RuleResult<&'r FunctionDefinition> {
    rule_type.function(name).ok_or_else(|| {
        RuleError::invalid_rule(format!(
            "function {name} doesn't exist for rule type {}",
            rule_type.name()
        ))
    })
}

/// Verifies the caller's context against a type's requirements.
fn check_context(scope: &EvalScope<'_>, rule_type: &RuleTypeDefinition) -> RuleResult<()> {
    for (key, kinds) in rule_type.required_context() {
        let Some(value) = scope.context().get(key) else {
            return Err(RuleError::missing_data(format!("missing context key {key}")));
        };
        if !kinds.is_empty() && !kinds.contains(&ValueKind::of(value)) {
            return Err(RuleError::missing_data(format!("context key {key} is of the wrong type")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Static Checks
// ============================================================================

/// Checks a leaf against the registry without evaluating it: the type and
/// every function must exist and argument counts must match.
///
/// # Errors
/// Returns [`RuleError::InvalidRule`] naming the first problem.
pub fn check_leaf(registry: &RuleRegistry, text: &str) -> RuleResult<LeafCheck> {
    let check = parse_check(text)?;
    let rule_type = registry.resolve(&check.type_name)?;
    for call in &check.calls {
        let function = resolve_function(rule_type, &call.name)?;
        function.args().check_arity(function.name(), call.args.len())?;
    }
    Ok(check)
}
