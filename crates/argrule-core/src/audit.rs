// crates/argrule-core/src/audit.rs
// ============================================================================
// Module: Rule Audit Logging
// Description: Structured audit events for rule compilation and validation.
// Purpose: Emit JSON-line logs without tying the engine to a logging backend.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The engine reports what it does through a [`RuleAuditSink`]. Events carry
//! counts and outcomes only; raw inputs and context values are never logged.
//! Deployments pick a sink: [`NoopAuditSink`] (default), [`StderrAuditSink`],
//! or [`FileAuditSink`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Rule audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Evaluation mode (`raw` or `typed`) for validation events.
    pub mode: Option<&'static str>,
    /// Number of checks in the rule, sub-expressions included.
    pub leaf_count: usize,
    /// Overall outcome for validation events.
    pub valid: Option<bool>,
    /// Number of failure reasons for validation events.
    pub error_count: usize,
    /// Optional diagnostic message.
    pub message: Option<String>,
}

impl RuleAuditEvent {
    /// Creates an event with a consistent timestamp and empty details.
    fn new(event: &'static str, leaf_count: usize) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            mode: None,
            leaf_count,
            valid: None,
            error_count: 0,
            message: None,
        }
    }

    /// Creates a `rule_compiled` event.
    #[must_use]
    pub fn compiled(leaf_count: usize) -> Self {
        Self::new("rule_compiled", leaf_count)
    }

    /// Creates a `rule_validated` event.
    #[must_use]
    pub fn validated(
        mode: &'static str,
        leaf_count: usize,
        valid: bool,
        error_count: usize,
    ) -> Self {
        Self {
            mode: Some(mode),
            valid: Some(valid),
            error_count,
            ..Self::new("rule_validated", leaf_count)
        }
    }

    /// Creates a `rule_warning` event.
    #[must_use]
    pub fn warning(leaf_count: usize, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new("rule_warning", leaf_count)
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for rule engine events.
pub trait RuleAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &RuleAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl RuleAuditSink for StderrAuditSink {
    fn record(&self, event: &RuleAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl RuleAuditSink for FileAuditSink {
    fn record(&self, event: &RuleAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl RuleAuditSink for NoopAuditSink {
    fn record(&self, _event: &RuleAuditEvent) {}
}
