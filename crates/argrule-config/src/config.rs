// crates/argrule-config/src/config.rs
// ============================================================================
// Module: Engine Configuration
// Description: TOML configuration for compile limits, policy, and auditing.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: argrule-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional; a missing file is an error only when a path was
//! requested explicitly or through `ARGRULE_CONFIG`.
//!
//! ```toml
//! [limits]
//! max_rule_bytes = 65536
//! max_nesting_depth = 32
//!
//! [compiler]
//! mixed_connectives = "warn"   # allow | warn | deny
//!
//! [audit]
//! sink = "file"                # none | stderr | file
//! path = "argrule-audit.log"
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use argrule_core::CompileLimits;
use argrule_core::FileAuditSink;
use argrule_core::MixedConnectivePolicy;
use argrule_core::NoopAuditSink;
use argrule_core::RuleAuditSink;
use argrule_core::RuleEngine;
use argrule_core::StderrAuditSink;
use argrule_core::compiler::DEFAULT_MAX_NESTING_DEPTH;
use argrule_core::compiler::DEFAULT_MAX_RULE_BYTES;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "argrule.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "ARGRULE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Upper bound for `limits.max_rule_bytes`.
pub(crate) const MAX_RULE_BYTES_CEILING: usize = 1024 * 1024;
/// Upper bound for `limits.max_nesting_depth`.
pub(crate) const MAX_NESTING_DEPTH_CEILING: usize = 128;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Rule engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Compile limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Compiler policy.
    #[serde(default)]
    pub compiler: CompilerConfig,
    /// Audit sink selection.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl EngineConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Without an explicit path or `ARGRULE_CONFIG`, a missing
    /// `argrule.toml` yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        if !explicit && !resolved.exists() {
            return Ok(Self::default());
        }
        let content = read_config_text(&resolved)?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.limits.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Returns the compile limits.
    #[must_use]
    pub const fn compile_limits(&self) -> CompileLimits {
        CompileLimits {
            max_rule_bytes: self.limits.max_rule_bytes,
            max_nesting_depth: self.limits.max_nesting_depth,
        }
    }

    /// Builds an engine with the built-in types and these settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit log cannot be opened.
    pub fn build_engine(&self) -> Result<RuleEngine, ConfigError> {
        Ok(RuleEngine::with_builtin_types()
            .with_limits(self.compile_limits())
            .with_mixed_connectives(self.compiler.mixed_connectives)
            .with_audit_sink(self.audit.build_sink()?))
    }
}

/// Compile limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum rule text size in bytes.
    #[serde(default = "default_max_rule_bytes")]
    pub max_rule_bytes: usize,
    /// Maximum sub-expression nesting depth.
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_rule_bytes: default_max_rule_bytes(),
            max_nesting_depth: default_max_nesting_depth(),
        }
    }
}

impl LimitsConfig {
    /// Validates limit ranges.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rule_bytes == 0 || self.max_rule_bytes > MAX_RULE_BYTES_CEILING {
            return Err(ConfigError::Invalid(format!(
                "limits.max_rule_bytes must be between 1 and {MAX_RULE_BYTES_CEILING}"
            )));
        }
        if self.max_nesting_depth == 0 || self.max_nesting_depth > MAX_NESTING_DEPTH_CEILING {
            return Err(ConfigError::Invalid(format!(
                "limits.max_nesting_depth must be between 1 and {MAX_NESTING_DEPTH_CEILING}"
            )));
        }
        Ok(())
    }
}

/// Compiler policy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Handling of unparenthesized `&&`/`||` mixes.
    #[serde(default)]
    pub mixed_connectives: MixedConnectivePolicy,
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Discard audit events.
    #[default]
    #[serde(rename = "none")]
    Off,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File,
}

/// Audit configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink type.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates sink settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::Off | AuditSinkKind::Stderr, Some(_)) => Err(ConfigError::Invalid(
                "audit.path is only valid for the file sink".to_string(),
            )),
            (AuditSinkKind::Off | AuditSinkKind::Stderr, None) => Ok(()),
        }
    }

    /// Opens the configured sink.
    fn build_sink(&self) -> Result<Arc<dyn RuleAuditSink>, ConfigError> {
        let sink: Arc<dyn RuleAuditSink> = match (&self.sink, &self.path) {
            (AuditSinkKind::File, Some(path)) => Arc::new(
                FileAuditSink::new(path).map_err(|err| ConfigError::Io(err.to_string()))?,
            ),
            (AuditSinkKind::File, None) => {
                return Err(ConfigError::Invalid(
                    "audit.path is required for the file sink".to_string(),
                ));
            }
            (AuditSinkKind::Stderr, _) => Arc::new(StderrAuditSink),
            (AuditSinkKind::Off, _) => Arc::new(NoopAuditSink),
        };
        Ok(sink)
    }
}

/// Default for `limits.max_rule_bytes`.
const fn default_max_rule_bytes() -> usize {
    DEFAULT_MAX_RULE_BYTES
}

/// Default for `limits.max_nesting_depth`.
const fn default_max_nesting_depth() -> usize {
    DEFAULT_MAX_NESTING_DEPTH
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
///
/// The flag is true when the path was requested explicitly.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path against length constraints.
fn validate_path_string(field: &str, path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Reads a TOML file with path, size, and encoding guards.
pub(crate) fn read_config_text(path: &Path) -> Result<String, ConfigError> {
    validate_path(path)?;
    let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    if bytes.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
    }
    String::from_utf8(bytes)
        .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
