// crates/argrule-core/tests/builtins.rs
// ============================================================================
// Test Module: Built-in Rule Types
// Coverage: str, int, bool, url, and dict converters, functions, formatters.
// ============================================================================
//! ## Overview
//! Integration tests for the default type catalog.

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

mod support;

use argrule_core::RuleError;
use argrule_core::ValidationOutcome;
use serde_json::json;
use support::TestResult;
use support::empty;
use support::engine;
use support::ensure;

/// Returns the reasons for a rule and raw input, or an empty list if valid.
fn reasons(rule: &str, raw: &str) -> Result<Vec<String>, RuleError> {
    Ok(engine().parse(rule, raw, &empty())?.errors().to_vec())
}

// ========================================================================
// str
// ========================================================================

/// Tests string refinement functions and their messages.
#[test]
fn string_functions() -> TestResult {
    ensure(reasons("str[includes(foo, bar)]", "xBARx")?.is_empty(), "case-insensitive includes")?;
    ensure(
        reasons("str[includes(foo, bar)]", "baz")?
            == ["Value doesn't include any of required words: foo, bar"],
        "includes message",
    )?;
    ensure(reasons("str[in(Red,Blue)]", "blue")?.is_empty(), "case-insensitive in")?;
    ensure(
        reasons("str[in(Red,Blue)]", "green")? == ["Value isn't one of required phrases: red, blue"],
        "in message",
    )?;
    ensure(reasons("str[alnum]", "user_name-01")?.is_empty(), "alnum with separators")?;
    ensure(reasons("str[alnum]", "no spaces!")? == ["Value isn't alphanumeric"], "alnum message")?;
    ensure(reasons("str[len(1,3) & alnum]", "abcd")?.len() == 1, "first failure stops the leaf")?;
    Ok(())
}

/// Tests regex matching is anchored at the start.
#[test]
fn string_regex() -> TestResult {
    ensure(reasons("str[regex([a-z]+)]", "abc123")?.is_empty(), "prefix match")?;
    ensure(
        reasons("str[regex([a-z]+)]", "1abc")? == ["Value failed regex check: [a-z]+"],
        "anchored at start",
    )?;
    ensure(
        matches!(engine().parse("str[regex(\\[)]", "x", &empty()), Err(RuleError::InvalidRule(_))),
        "bad pattern is a rule error",
    )?;
    Ok(())
}

/// Tests escaped separators inside arguments.
#[test]
fn escaped_arguments_are_literal() -> TestResult {
    ensure(reasons(r"str[in(a\,b, c)]", "a,b")?.is_empty(), "escaped comma kept")?;
    ensure(reasons(r"str[includes(\))]", "x)")?.is_empty(), "escaped paren kept")?;
    Ok(())
}

// ========================================================================
// int
// ========================================================================

/// Tests integer conversion and bounds.
#[test]
fn integer_functions() -> TestResult {
    let engine = engine();
    ensure(
        engine.parse("int", " -12 ", &empty())? == ValidationOutcome::Valid(json!(-12)),
        "signed and trimmed",
    )?;
    ensure(reasons("int", "1.5")? == ["Unable to convert to int"], "no floats")?;
    ensure(reasons("int[less(5)]", "5")? == ["Value isn't less than 5"], "less is strict")?;
    ensure(reasons("int[greater(5)]", "6")?.is_empty(), "greater passes")?;
    ensure(reasons("int[between(1,5)]", "5")?.is_empty(), "between is inclusive")?;
    Ok(())
}

// ========================================================================
// bool
// ========================================================================

/// Tests boolean words and formatting.
#[test]
fn bool_words_and_format() -> TestResult {
    let engine = engine();
    for word in ["yes", "Y", "TRUE", "t", "enable", "on"] {
        ensure(engine.parse("bool", word, &empty())?.value() == Some(&json!(true)), word)?;
    }
    for word in ["no", "n", "false", "F", "disable", "OFF"] {
        ensure(engine.parse("bool", word, &empty())?.value() == Some(&json!(false)), word)?;
    }
    ensure(reasons("bool", "maybe")? == ["Unable to convert into bool"], "unknown word")?;
    ensure(engine.format_value("bool", &json!(true))? == "Yes", "Yes")?;
    ensure(engine.format_value("bool", &json!(false))? == "No", "No")?;
    Ok(())
}

// ========================================================================
// url
// ========================================================================

/// Tests url validation messages.
#[test]
fn url_checks() -> TestResult {
    ensure(reasons("url", "https://example.com/path")?.is_empty(), "valid url")?;
    ensure(
        reasons("url", "https://exa mple.com")?
            == ["URL cannot have whitespace in it - is it properly encoded?"],
        "whitespace",
    )?;
    ensure(
        reasons("url", "example.com")? == ["Missing protocol (http:// or https://)"],
        "protocol",
    )?;
    ensure(
        reasons("url", "ftp://example.com")? == ["Invalid protocol (must be http or https)"],
        "scheme",
    )?;
    ensure(reasons("url", "http://localhost/x")? == ["Invalid domain"], "domain")?;
    Ok(())
}

// ========================================================================
// dict
// ========================================================================

/// Tests dict parsing with nested key and value rules.
#[test]
fn dict_nested_rules() -> TestResult {
    let engine = engine();
    let outcome = engine.parse("dict[value(int)]", "a==1 b==2", &empty())?;
    ensure(outcome == ValidationOutcome::Valid(json!({"a": 1, "b": 2})), "values parsed as int")?;

    let outcome = engine.parse("dict[value(int[less(2)])]", "a==1 b==2", &empty())?;
    ensure(
        outcome.errors() == ["Validation failed for value of b: Value isn't less than 2"],
        "value failure names the key",
    )?;

    let outcome = engine.parse("dict[key(str[len(1,1)])]", "ab==1", &empty())?;
    ensure(
        outcome.errors()
            == ["Validation failed key name ab: Value's length isn't within bounds: 1 to 1"],
        "key failure names the key",
    )?;

    let outcome = engine.parse_typed("dict[value(int || bool)]", &json!({"x": 3, "y": true}), &empty())?;
    ensure(outcome.is_valid(), "typed values use typed nested validation")?;
    Ok(())
}

/// Tests an escaped separator inside a nested rule survives to that rule.
#[test]
fn dict_nested_rule_keeps_inner_escapes() -> TestResult {
    let engine = engine();
    let rule = r"dict[value(str[in(a\,b)])]";
    let outcome = engine.parse(rule, "k==a,b", &empty())?;
    ensure(outcome == ValidationOutcome::Valid(json!({"k": "a,b"})), "escaped comma is one option")?;

    let outcome = engine.parse(rule, "k==a", &empty())?;
    ensure(!outcome.is_valid(), "a alone is not an option")?;
    Ok(())
}

/// Tests dict formatting round trip.
#[test]
fn dict_format_round_trip() -> TestResult {
    let engine = engine();
    let Some(value) = engine.parse("dict", "name==Jo Ann city==Oslo", &empty())?.value().cloned()
    else {
        return Err("expected a dict value".into());
    };
    ensure(engine.format_value("dict", &value)? == "name==Jo Ann city==Oslo", "canonical text")
}
