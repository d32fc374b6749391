// crates/argrule-core/tests/support/mod.rs
// ============================================================================
// Module: Test Support
// Description: Shared result helpers and fixtures for argrule integration tests.
// ============================================================================
//! ## Overview
//! Result-based assertions plus small engine and context builders.

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
    dead_code,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;

use argrule_core::Context;
use argrule_core::RuleAuditEvent;
use argrule_core::RuleAuditSink;
use argrule_core::RuleEngine;

// ========================================================================
// Test Result Helpers
// ========================================================================

/// Standard result type used across argrule integration tests.
pub type TestResult<T = ()> = Result<T, Box<dyn Error>>;

/// Lightweight error type for test assertions.
#[derive(Debug)]
struct TestError {
    /// Human-readable failure message.
    message: String,
}

impl fmt::Display for TestError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.message)
    }
}

impl Error for TestError {}

/// Returns an error when a test condition fails.
///
/// # Errors
/// Returns a `TestError` when the condition is false.
pub fn ensure(condition: bool, message: impl Into<String>) -> TestResult {
    if condition {
        Ok(())
    } else {
        Err(Box::new(TestError {
            message: message.into(),
        }))
    }
}

// ========================================================================
// Fixtures
// ========================================================================

/// Engine with the built-in types and default settings.
pub fn engine() -> RuleEngine {
    RuleEngine::with_builtin_types()
}

/// Empty evaluation context.
pub fn empty() -> Context {
    Context::new()
}

/// Audit sink that keeps every event in memory.
#[derive(Default)]
pub struct RecordingSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<RuleAuditEvent>>,
}

impl RecordingSink {
    /// Creates a shared recording sink.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns a snapshot of the recorded events.
    pub fn events(&self) -> Vec<RuleAuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl RuleAuditSink for RecordingSink {
    fn record(&self, event: &RuleAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
