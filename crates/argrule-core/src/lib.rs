// crates/argrule-core/src/lib.rs
// ============================================================================
// Module: Argrule Core Root
// Description: Public API surface for the rule language engine.
// Purpose: Wire together the compiler, registry, evaluators, and formatter.
// Dependencies: crate::{audit, builtins, check, compiler, engine, error, formatter, leaf,
//              registry, validator, value}
// ============================================================================

//! ## Overview
//! Argrule compiles small rule expressions such as
//! `str[len(2,5)] && @int[between(1,10)]` into trees, validates raw text or
//! typed values against them, and describes them in plain language.
//!
//! Most callers only need [`RuleEngine`]:
//!
//! ```
//! use argrule_core::RuleEngine;
//! use argrule_core::ValidationOutcome;
//! use argrule_core::value::Context;
//! use serde_json::json;
//!
//! let engine = RuleEngine::with_builtin_types();
//! let outcome = engine.parse("int[between(1,5)]", "3", &Context::new()).unwrap();
//! assert_eq!(outcome, ValidationOutcome::Valid(json!(3)));
//! ```

// ============================================================================
// SECTION: Core Modules
// ============================================================================

pub mod audit;
pub mod builtins;
pub mod check;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod formatter;
pub mod leaf;
pub mod registry;
pub mod validator;
pub mod value;

#[cfg(test)]
mod tests;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::RuleAuditEvent;
pub use audit::RuleAuditSink;
pub use audit::StderrAuditSink;
pub use check::FunctionCall;
pub use check::LeafCheck;
pub use check::parse_check;
pub use compiler::CompileLimits;
pub use compiler::CompiledRule;
pub use compiler::Connective;
pub use compiler::Group;
pub use compiler::Leaf;
pub use compiler::compile;
pub use compiler::compile_with_limits;
pub use engine::EvalScope;
pub use engine::MixedConnectivePolicy;
pub use engine::RuleEngine;
pub use engine::RuleRef;
pub use error::CompileError;
pub use error::RuleError;
pub use error::RuleResult;
pub use formatter::describe;
pub use formatter::render_template;
pub use leaf::evaluate_leaf;
pub use registry::ArgKind;
pub use registry::ArgSpec;
pub use registry::Converter;
pub use registry::FunctionDefinition;
pub use registry::RuleFunction;
pub use registry::RuleRegistry;
pub use registry::RuleTypeDefinition;
pub use registry::ValueFormatter;
pub use validator::ValidationOutcome;
pub use validator::validate;
pub use value::Context;
pub use value::Input;
pub use value::ValueKind;
