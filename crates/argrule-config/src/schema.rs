// crates/argrule-config/src/schema.rs
// ============================================================================
// Module: Config Key Validation
// Description: Validates configuration documents against per-key rules.
// Purpose: Report every bad or missing key with what its rule expects.
// Dependencies: argrule-core, serde, serde_json, toml
// ============================================================================

//! ## Overview
//! A [`ConfigSchema`] declares one rule per configuration key. Rules are
//! compiled once up front, so an authoring mistake fails at load time rather
//! than on the first document. Validation then walks every declared key:
//!
//! - a missing key is reported as `Missing key '<key>'.`;
//! - string values are parsed from text, other values are checked as typed
//!   values;
//! - each failure becomes a [`ConfigIssue`] carrying the reasons, the rule's
//!   description, and an optional sample value.
//!
//! Schema files map keys to rule text, or to a table with a sample:
//!
//! ```toml
//! port = "int[between(1,65535)]"
//! debug = "bool"
//!
//! [homepage]
//! rule = "url"
//! sample = "https://example.com"
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::Path;

use argrule_core::CompiledRule;
use argrule_core::RuleEngine;
use argrule_core::ValidationOutcome;
use argrule_core::value::Context;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::config::ConfigError;
use crate::config::read_config_text;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One declared configuration key.
#[derive(Debug, Clone)]
struct SchemaEntry {
    /// Configuration key.
    key: String,
    /// Rule text as written.
    source: String,
    /// Compiled rule.
    rule: CompiledRule,
    /// Optional example value shown with failures.
    sample: Option<String>,
}

/// Schema file entry: rule text, or a table with a sample.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EntrySpec {
    /// `key = "rule"`
    Rule(String),
    /// `[key] rule = "...", sample = "..."`
    Detailed {
        /// Rule text.
        rule: String,
        /// Example value.
        #[serde(default)]
        sample: Option<String>,
    },
}

/// Compiled rules keyed by configuration key, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ConfigSchema {
    /// Declared keys.
    entries: Vec<SchemaEntry>,
}

/// A configuration key that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigIssue {
    /// Configuration key.
    pub key: String,
    /// Failure reasons.
    pub reasons: Vec<String>,
    /// Description of what the rule expects.
    pub expected: String,
    /// Example value, when the schema provides one.
    pub sample: Option<String>,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed for '{}': {}", self.key, self.reasons.join(", "))?;
        write!(f, "\nExpected: {}", self.expected.replace('\n', "\n  "))?;
        if let Some(sample) = &self.sample {
            write!(f, "\nSample: {sample}")?;
        }
        Ok(())
    }
}

/// Result of validating a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaReport {
    /// Validated values keyed by configuration key.
    pub values: Map<String, Value>,
    /// Keys that failed.
    pub issues: Vec<ConfigIssue>,
}

impl SchemaReport {
    /// Returns true when no key failed.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Converts into the validated values or the issues.
    ///
    /// # Errors
    /// Returns every issue when at least one key failed.
    pub fn into_result(self) -> Result<Map<String, Value>, Vec<ConfigIssue>> {
        if self.issues.is_empty() { Ok(self.values) } else { Err(self.issues) }
    }
}

// ============================================================================
// SECTION: Construction
// ============================================================================

impl ConfigSchema {
    /// Compiles a rule for every `(key, rule)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first rule that fails to
    /// compile.
    pub fn compile<K, R>(
        engine: &RuleEngine,
        rules: impl IntoIterator<Item = (K, R)>,
    ) -> Result<Self, ConfigError>
    where
        K: Into<String>,
        R: AsRef<str>,
    {
        let mut schema = Self::default();
        for (key, rule) in rules {
            schema.push(engine, key.into(), rule.as_ref(), None)?;
        }
        Ok(schema)
    }

    /// Parses and compiles a schema from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for malformed entries or rules.
    pub fn from_toml_str(engine: &RuleEngine, content: &str) -> Result<Self, ConfigError> {
        let table: toml::Table =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        let mut schema = Self::default();
        for (key, value) in table {
            let spec: EntrySpec = value.try_into().map_err(|_| {
                ConfigError::Invalid(format!(
                    "schema entry '{key}' must be a rule string or a table with `rule`"
                ))
            })?;
            match spec {
                EntrySpec::Rule(rule) => schema.push(engine, key, &rule, None)?,
                EntrySpec::Detailed {
                    rule,
                    sample,
                } => schema.push(engine, key, &rule, sample)?,
            }
        }
        Ok(schema)
    }

    /// Loads a schema file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or compiled.
    pub fn load(engine: &RuleEngine, path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(engine, &read_config_text(path)?)
    }

    /// Compiles and records one entry.
    fn push(
        &mut self,
        engine: &RuleEngine,
        key: String,
        source: &str,
        sample: Option<String>,
    ) -> Result<(), ConfigError> {
        let rule = engine.compile_rule(source).map_err(|err| {
            ConfigError::Invalid(format!("rule for key '{key}' is invalid: {err}"))
        })?;
        self.entries.push(SchemaEntry {
            key,
            source: source.to_string(),
            rule,
            sample,
        });
        Ok(())
    }

    /// Iterates over declared keys and their rule text.
    pub fn keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|entry| (entry.key.as_str(), entry.source.as_str()))
    }

    // ========================================================================
    // SECTION: Validation
    // ========================================================================

    /// Validates a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a rule cannot be evaluated, such
    /// as a rule that needs context the schema does not supply.
    pub fn validate(
        &self,
        engine: &RuleEngine,
        document: &Map<String, Value>,
    ) -> Result<SchemaReport, ConfigError> {
        let context = Context::new();
        let mut report = SchemaReport::default();

        for entry in &self.entries {
            let outcome = match document.get(&entry.key) {
                None => Ok(ValidationOutcome::Invalid(vec![format!("Missing key '{}'.", entry.key)])),
                Some(Value::String(text)) => engine.parse(&entry.rule, text, &context),
                Some(other) => engine.parse_typed(&entry.rule, other, &context),
            }
            .map_err(|err| {
                ConfigError::Invalid(format!("rule for key '{}' failed: {err}", entry.key))
            })?;

            match outcome {
                ValidationOutcome::Valid(value) => {
                    report.values.insert(entry.key.clone(), value);
                }
                ValidationOutcome::Invalid(reasons) => report.issues.push(ConfigIssue {
                    key: entry.key.clone(),
                    reasons,
                    expected: engine.describe_rule(&entry.rule).unwrap_or_default(),
                    sample: entry.sample.clone(),
                }),
            }
        }
        Ok(report)
    }

    /// Validates a parsed TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document cannot be represented as
    /// JSON or a rule cannot be evaluated.
    pub fn validate_toml(
        &self,
        engine: &RuleEngine,
        document: &toml::Table,
    ) -> Result<SchemaReport, ConfigError> {
        let Value::Object(map) =
            serde_json::to_value(document).map_err(|err| ConfigError::Invalid(err.to_string()))?
        else {
            return Err(ConfigError::Invalid("config document must be a table".to_string()));
        };
        self.validate(engine, &map)
    }

    /// Loads and validates a TOML document file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// evaluated.
    pub fn validate_file(
        &self,
        engine: &RuleEngine,
        path: &Path,
    ) -> Result<SchemaReport, ConfigError> {
        let document: toml::Table = toml::from_str(&read_config_text(path)?)
            .map_err(|err| ConfigError::Parse(err.to_string()))?;
        self.validate_toml(engine, &document)
    }
}
