//! Config load validation tests for argrule-config.
// crates/argrule-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding, ranges).
// Purpose: Ensure engine config handling is strict and fail-closed.
// =============================================================================

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

use std::io::Write;
use std::path::Path;

use argrule_config::AuditSinkKind;
use argrule_config::ConfigError;
use argrule_config::EngineConfig;
use argrule_core::MixedConnectivePolicy;
use argrule_core::RuleError;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<EngineConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

fn write_config(content: &[u8]) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(content).map_err(|err| err.to_string())?;
    Ok(file)
}

/// Tests load rejects path component too long.
#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    assert_invalid(EngineConfig::load(Some(path)), "config path component too long")
}

/// Tests load rejects missing explicit file.
#[test]
fn load_rejects_missing_explicit_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    assert_invalid(EngineConfig::load(Some(&path)), "config io error")
}

/// Tests load rejects oversized file.
#[test]
fn load_rejects_oversized_file() -> TestResult {
    let file = write_config(&vec![b'#'; 1_048_577])?;
    assert_invalid(EngineConfig::load(Some(file.path())), "config file exceeds size limit")
}

/// Tests load rejects non utf8 file.
#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let file = write_config(&[0xFF, 0xFE, 0xFF])?;
    assert_invalid(EngineConfig::load(Some(file.path())), "config file must be utf-8")
}

/// Tests load rejects unknown fields.
#[test]
fn load_rejects_unknown_fields() -> TestResult {
    let file = write_config(b"[limits]\nmax_rule_bytes = 10\nspeed = 3\n")?;
    assert_invalid(EngineConfig::load(Some(file.path())), "config parse error")
}

/// Tests limits are range checked.
#[test]
fn limits_are_range_checked() -> TestResult {
    assert_invalid(
        EngineConfig::from_toml_str("[limits]\nmax_rule_bytes = 0\n"),
        "limits.max_rule_bytes must be between 1 and 1048576",
    )?;
    assert_invalid(
        EngineConfig::from_toml_str("[limits]\nmax_nesting_depth = 129\n"),
        "limits.max_nesting_depth must be between 1 and 128",
    )
}

/// Tests audit file sink requires path.
#[test]
fn audit_file_sink_requires_path() -> TestResult {
    assert_invalid(
        EngineConfig::from_toml_str("[audit]\nsink = \"file\"\n"),
        "audit.path is required for the file sink",
    )?;
    assert_invalid(
        EngineConfig::from_toml_str("[audit]\nsink = \"stderr\"\npath = \"x.log\"\n"),
        "audit.path is only valid for the file sink",
    )
}

/// Tests load parses every section.
#[test]
fn load_parses_every_section() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let log = dir.path().join("audit.log");
    let content = format!(
        "[limits]\nmax_rule_bytes = 128\nmax_nesting_depth = 4\n\n[compiler]\nmixed_connectives \
         = \"deny\"\n\n[audit]\nsink = \"file\"\npath = {:?}\n",
        log.to_string_lossy()
    );
    let file = write_config(content.as_bytes())?;
    let config = EngineConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.limits.max_rule_bytes != 128 || config.limits.max_nesting_depth != 4 {
        return Err("limits not loaded".to_string());
    }
    if config.compiler.mixed_connectives != MixedConnectivePolicy::Deny {
        return Err("policy not loaded".to_string());
    }
    if config.audit.sink != AuditSinkKind::File {
        return Err("sink not loaded".to_string());
    }

    let engine = config.build_engine().map_err(|err| err.to_string())?;
    match engine.compile_rule("int && str || bool") {
        Err(RuleError::InvalidRule(_)) => {}
        other => return Err(format!("expected deny policy, got {other:?}")),
    }
    match engine.compile_rule(&"str && ".repeat(40)) {
        Err(RuleError::InvalidRule(message)) if message.contains("size limit") => {}
        other => return Err(format!("expected size limit, got {other:?}")),
    }
    engine.compile_rule("int").map_err(|err| err.to_string())?;
    let written = std::fs::read_to_string(&log).map_err(|err| err.to_string())?;
    if !written.contains("\"rule_compiled\"") {
        return Err("audit log missing compile event".to_string());
    }
    Ok(())
}

/// Tests empty config uses defaults.
#[test]
fn empty_config_uses_defaults() -> TestResult {
    let config = EngineConfig::from_toml_str("").map_err(|err| err.to_string())?;
    if config.compiler.mixed_connectives != MixedConnectivePolicy::Warn {
        return Err("default policy should warn".to_string());
    }
    if config.audit.sink != AuditSinkKind::Off {
        return Err("default sink should be none".to_string());
    }
    Ok(())
}
