// crates/argrule-core/src/tests.rs
// ============================================================================
// Module: Argrule Core Unit Tests
// Description: Crate-internal checks for scanning helpers and tree evaluation.
// Purpose: Cover behavior that the public API only exercises indirectly.
// Dependencies: argrule-core, serde_json
// ============================================================================

//! ## Overview
//! Unit tests for private scanning helpers plus memoization checks that need
//! a counting rule type.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use serde_json::Value;
use serde_json::json;

use crate::compiler::Connective;
use crate::compiler::find_separator;
use crate::compiler::strip_wrapping_parens;
use crate::engine::EvalScope;
use crate::engine::RuleEngine;
use crate::error::RuleError;
use crate::error::RuleResult;
use crate::registry::RuleTypeDefinition;
use crate::validator::ValidationOutcome;
use crate::value::Context;

// ============================================================================
// SECTION: Scanning Helpers
// ============================================================================

/// Tests find separator is leftmost regardless of token.
#[test]
fn find_separator_is_leftmost_regardless_of_token() {
    assert_eq!(find_separator("a || b && c"), Some((2, Connective::Or)));
    assert_eq!(find_separator("a && b || c"), Some((2, Connective::And)));
}

/// Tests find separator ignores nested and escaped tokens.
#[test]
fn find_separator_ignores_nested_and_escaped_tokens() {
    assert_eq!(find_separator("(a && b)"), None);
    assert_eq!(find_separator("str[regex(a||b)]"), None);
    assert_eq!(find_separator(r"a\&&b"), None);
}

/// Tests strip wrapping parens only strips spanning pairs.
#[test]
fn strip_wrapping_parens_only_strips_spanning_pairs() {
    assert_eq!(strip_wrapping_parens(" ((a && b)) "), "a && b");
    assert_eq!(strip_wrapping_parens("(a) && (b)"), "(a) && (b)");
}

// ============================================================================
// SECTION: Memoization
// ============================================================================

/// Builds an engine with a `count` type that records converter calls.
fn counting_engine(calls: &Arc<AtomicUsize>) -> RuleEngine {
    let counter = Arc::clone(calls);
    let mut engine = RuleEngine::with_builtin_types();
    engine.register_type(RuleTypeDefinition::new(
        "count",
        "a counted value",
        move |raw: &str, _scope: &EvalScope<'_>| -> RuleResult<Value> {
            counter.fetch_add(1, Ordering::SeqCst);
            if raw == "bad" {
                return Err(RuleError::invalid_data("counted failure"));
            }
            Ok(Value::String(raw.to_string()))
        },
    ));
    engine
}

/// Tests shared leaf is evaluated once.
#[test]
fn shared_leaf_is_evaluated_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = counting_engine(&calls);
    // Leaf 1 is referenced by both Combine groups.
    let outcome = engine.parse("str && count || str", "ok", &Context::new()).unwrap();
    assert!(outcome.is_valid());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Tests shared failing leaf reports once.
#[test]
fn shared_failing_leaf_reports_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = counting_engine(&calls);
    let outcome = engine.parse("count && count || count", "bad", &Context::new()).unwrap();
    assert_eq!(
        outcome,
        ValidationOutcome::Invalid(vec![
            "counted failure".to_string(),
            "counted failure".to_string(),
            "counted failure".to_string(),
        ])
    );
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

/// Tests first valid leaf is returned without capture.
#[test]
fn first_valid_leaf_is_returned_without_capture() {
    let engine = RuleEngine::with_builtin_types();
    let outcome = engine.parse("int || str", "12", &Context::new()).unwrap();
    assert_eq!(outcome, ValidationOutcome::Valid(json!(12)));
}
