// crates/argrule-config/src/lib.rs
// ============================================================================
// Module: Argrule Config Root
// Description: Engine configuration and config-key validation.
// Purpose: Load engine settings from TOML and validate documents against
//          key-to-rule schemas.
// Dependencies: crate::{config, schema}
// ============================================================================

//! ## Overview
//! [`EngineConfig`] builds a [`argrule_core::RuleEngine`] from `argrule.toml`.
//! [`ConfigSchema`] is the consumer side: it declares a rule per
//! configuration key and reports every key whose value fails its rule,
//! together with a description of what the rule expects.

pub mod config;
pub mod schema;

pub use config::AuditConfig;
pub use config::AuditSinkKind;
pub use config::CompilerConfig;
pub use config::ConfigError;
pub use config::EngineConfig;
pub use config::LimitsConfig;
pub use schema::ConfigIssue;
pub use schema::ConfigSchema;
pub use schema::SchemaReport;
