// crates/argrule-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for context and JSON argument parsing.
// Purpose: Ensure malformed command-line inputs fail with clear messages.
// Dependencies: argrule-cli main helpers
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

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::json;

use super::parse_context;
use super::parse_json_arg;

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Tests that context values are read as JSON with a string fallback.
#[test]
fn parse_context_reads_json_or_string() {
    let entries = vec!["limit=5".to_string(), "name=bob".to_string(), "flag=true".to_string()];
    let context = parse_context(&entries).unwrap();
    assert_eq!(context.get("limit"), Some(&json!(5)));
    assert_eq!(context.get("name"), Some(&json!("bob")));
    assert_eq!(context.get("flag"), Some(&json!(true)));
}

/// Tests that values may contain `=`.
#[test]
fn parse_context_splits_on_first_equals() {
    let context = parse_context(&["expr=a==b".to_string()]).unwrap();
    assert_eq!(context.get("expr"), Some(&json!("a==b")));
}

/// Tests that entries without a key are rejected.
#[test]
fn parse_context_rejects_malformed_entries() {
    let err = parse_context(&["novalue".to_string()]).unwrap_err();
    assert!(err.to_string().contains("must be KEY=VALUE"));
    let err = parse_context(&["=5".to_string()]).unwrap_err();
    assert!(err.to_string().contains("empty key"));
}

/// Tests that JSON arguments report their label on failure.
#[test]
fn parse_json_arg_names_the_argument() {
    assert_eq!(parse_json_arg("input", "[1,2]").unwrap(), json!([1, 2]));
    let err = parse_json_arg("input", "{oops").unwrap_err();
    assert!(err.to_string().starts_with("input is not valid JSON"));
}

