// crates/argrule-core/tests/engine.rs
// ============================================================================
// Test Module: Rule Engine Facade
// Coverage: Compile-time registry checks, mixed-connective policy, custom
//           types, and audit events.
// ============================================================================
//! ## Overview
//! Integration tests for the engine operations and their audit trail.

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

use std::fs;

use argrule_core::ArgKind;
use argrule_core::ArgSpec;
use argrule_core::CompileLimits;
use argrule_core::EvalScope;
use argrule_core::FileAuditSink;
use argrule_core::FunctionDefinition;
use argrule_core::MixedConnectivePolicy;
use argrule_core::RuleAuditSink;
use argrule_core::RuleEngine;
use argrule_core::RuleError;
use argrule_core::RuleResult;
use argrule_core::RuleTypeDefinition;
use argrule_core::ValidationOutcome;
use argrule_core::ValueKind;
use serde_json::Value;
use serde_json::json;
use support::RecordingSink;
use support::TestResult;
use support::empty;
use support::engine;
use support::ensure;

// ========================================================================
// Compilation
// ========================================================================

/// Tests compile_rule checks names and arity against the registry.
#[test]
fn compile_rule_checks_registry() -> TestResult {
    let engine = engine();
    ensure(engine.compile_rule("str[len(1,2)] && (int || bool)").is_ok(), "valid rule")?;
    for bad in ["text", "str[size(1)]", "int[less]", "(int || nope) && str", "int[between(1,5"] {
        ensure(
            matches!(engine.compile_rule(bad), Err(RuleError::InvalidRule(_))),
            format!("expected InvalidRule for {bad}"),
        )?;
    }
    Ok(())
}

/// Tests type and function names are case-insensitive.
#[test]
fn names_are_case_insensitive() -> TestResult {
    let outcome = engine().parse("INT[Between(1,5)]", "2", &empty())?;
    ensure(outcome == ValidationOutcome::Valid(json!(2)), "case-insensitive lookup")
}

/// Tests the deny policy rejects unparenthesized mixed chains.
#[test]
fn deny_policy_rejects_mixed_chains() -> TestResult {
    let engine = engine().with_mixed_connectives(MixedConnectivePolicy::Deny);
    ensure(
        matches!(engine.compile_rule("int && str || bool"), Err(RuleError::InvalidRule(_))),
        "mixed chain denied",
    )?;
    ensure(engine.compile_rule("(int && str) || bool").is_ok(), "parenthesized chain allowed")?;
    Ok(())
}

/// Tests the engine reports its settings and registered types.
#[test]
fn engine_exposes_settings_and_types() -> TestResult {
    let limits = CompileLimits {
        max_rule_bytes: 64,
        max_nesting_depth: 2,
    };
    let engine = engine()
        .with_limits(limits)
        .with_mixed_connectives(MixedConnectivePolicy::Allow);
    ensure(*engine.limits() == limits, "limits kept")?;
    ensure(engine.mixed_connectives() == MixedConnectivePolicy::Allow, "policy kept")?;

    let names: Vec<&str> = engine.registry().names().collect();
    ensure(names == ["bool", "dict", "int", "str", "url"], format!("unexpected types {names:?}"))?;

    let int_type = engine.registry().resolve("int")?;
    let functions: Vec<&str> = int_type.functions().map(FunctionDefinition::name).collect();
    ensure(functions == ["between", "greater", "less"], format!("unexpected {functions:?}"))
}

/// Tests a pre-compiled rule with broken indices is rejected.
#[test]
fn malformed_compiled_rule_is_rejected() -> TestResult {
    let rule: argrule_core::CompiledRule = serde_json::from_value(json!({
        "leaves": [{"check": "int"}],
        "groups": [{"type": "combine", "connective": "and", "leaves": [0, 1]}],
        "capture": null
    }))?;
    ensure(
        matches!(engine().parse(&rule, "1", &empty()), Err(RuleError::InvalidRule(_))),
        "missing leaf index",
    )
}

// ========================================================================
// Extension
// ========================================================================

/// Rejects even numbers.
fn odd(value: &Value, _args: &[Value], _scope: &EvalScope<'_>) -> RuleResult<Option<Value>> {
    if value.as_f64().is_some_and(|number| number % 2.0 == 0.0) {
        return Err(RuleError::invalid_data("Value isn't odd"));
    }
    Ok(None)
}

/// Scales the value by a float argument.
fn scale(value: &Value, args: &[Value], _scope: &EvalScope<'_>) -> RuleResult<Option<Value>> {
    let factor = args.first().and_then(Value::as_f64).unwrap_or(1.0);
    Ok(value.as_f64().map(|number| json!(number * factor)))
}

/// Parses a float.
fn convert_float(raw: &str, _scope: &EvalScope<'_>) -> RuleResult<Value> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| RuleError::invalid_data("Unable to convert to float"))
}

/// Tests registering a custom type with value-replacing functions.
#[test]
fn custom_types_extend_the_registry() -> TestResult {
    let mut engine = engine();
    engine.register_type(
        RuleTypeDefinition::new("float", "a number", convert_float)
            .accepts(ValueKind::Float)
            .accepts(ValueKind::Integer)
            .with_function(FunctionDefinition::new("odd", "that is odd", ArgSpec::none(), odd))
            .with_function(FunctionDefinition::new(
                "scale",
                "scaled by %0",
                ArgSpec::fixed(ArgKind::Float, 1),
                scale,
            )),
    );

    let outcome = engine.parse("float[scale(2.5)]", "2", &empty())?;
    ensure(outcome == ValidationOutcome::Valid(json!(5.0)), "scale replaces the value")?;
    ensure(
        engine.parse("float[scale(2) & odd]", "3", &empty())?.errors() == ["Value isn't odd"],
        "functions see the replaced value",
    )?;
    ensure(
        engine.describe_rule("float[scale(3) & odd]")? == "a number scaled by 3, that is odd",
        "custom templates",
    )?;
    Ok(())
}

// ========================================================================
// Audit
// ========================================================================

/// Tests compile and validate events with counts only.
#[test]
fn audit_records_compile_and_validate() -> TestResult {
    let sink = RecordingSink::shared();
    let engine = RuleEngine::with_builtin_types().with_audit_sink(sink.clone());
    engine.parse("str && int[between(1,5)]", "9", &empty())?;

    let events = sink.events();
    ensure(events.len() == 2, "compile then validate")?;
    ensure(events[0].event == "rule_compiled" && events[0].leaf_count == 2, "compiled event")?;
    ensure(
        events[1].event == "rule_validated"
            && events[1].mode == Some("raw")
            && events[1].valid == Some(false)
            && events[1].error_count == 1,
        "validated event",
    )?;
    Ok(())
}

/// Tests the warn policy emits a warning event.
#[test]
fn warn_policy_records_warning() -> TestResult {
    let sink = RecordingSink::shared();
    let engine = RuleEngine::with_builtin_types()
        .with_mixed_connectives(MixedConnectivePolicy::Warn)
        .with_audit_sink(sink.clone());
    engine.compile_rule("int && str || bool")?;
    engine.compile_rule("(int && str) || bool")?;

    let warnings: Vec<_> =
        sink.events().into_iter().filter(|event| event.event == "rule_warning").collect();
    ensure(warnings.len() == 1, "only the unparenthesized chain warns")
}

/// Tests the file sink appends JSON lines.
#[test]
fn file_sink_writes_json_lines() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("audit.log");
    let sink = FileAuditSink::new(&path)?;
    sink.record(&argrule_core::RuleAuditEvent::compiled(3));
    sink.record(&argrule_core::RuleAuditEvent::validated("typed", 3, true, 0));

    let contents = fs::read_to_string(&path)?;
    let lines: Vec<Value> =
        contents.lines().map(serde_json::from_str::<Value>).collect::<Result<_, _>>()?;
    ensure(lines.len() == 2, "two lines")?;
    ensure(lines[0]["event"] == "rule_compiled", "first event id")?;
    ensure(lines[1]["mode"] == "typed" && lines[1]["valid"] == true, "second event fields")?;
    Ok(())
}
