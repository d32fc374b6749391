// crates/argrule-core/src/engine.rs
// ============================================================================
// Module: Rule Engine
// Description: Facade over the registry, compiler, evaluator, and formatter.
// Purpose: Expose compile, parse, parse-typed, and describe to collaborators.
// Dependencies: serde, serde_json, crate::*
// ============================================================================

//! ## Overview
//! [`RuleEngine`] owns everything a rule needs at runtime: the type registry,
//! compile limits, the mixed-connective policy, and an audit sink. It is
//! passed explicitly to every converter and function through [`EvalScope`],
//! so nested validation (for example a dict's per-value rule) reaches the same
//! registry without any global state.
//!
//! Rules can be handed over as text or pre-compiled via [`RuleRef`]; callers
//! validating many inputs against one rule should compile it once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Cow;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::audit::NoopAuditSink;
use crate::audit::RuleAuditEvent;
use crate::audit::RuleAuditSink;
use crate::compiler::CompileLimits;
use crate::compiler::CompiledRule;
use crate::compiler::Leaf;
use crate::compiler::compile_with_limits;
use crate::error::CompileError;
use crate::error::RuleError;
use crate::error::RuleResult;
use crate::formatter::describe;
use crate::leaf::check_leaf;
use crate::registry::RuleRegistry;
use crate::registry::RuleTypeDefinition;
use crate::validator::ValidationOutcome;
use crate::validator::validate;
use crate::value::Context;
use crate::value::Input;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Handling of rules that chain `&&` and `||` without parentheses.
///
/// Such chains group strictly left to right, which rarely matches what the
/// author meant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixedConnectivePolicy {
    /// Compile silently.
    Allow,
    /// Compile and emit a `rule_warning` audit event.
    #[default]
    Warn,
    /// Refuse to compile.
    Deny,
}

// ============================================================================
// SECTION: Rule References
// ============================================================================

/// A rule given either as text or already compiled.
#[derive(Debug, Clone, Copy)]
pub enum RuleRef<'a> {
    /// Rule text, compiled on use.
    Text(&'a str),
    /// Pre-compiled rule.
    Compiled(&'a CompiledRule),
}

impl<'a> From<&'a str> for RuleRef<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a String> for RuleRef<'a> {
    fn from(text: &'a String) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a CompiledRule> for RuleRef<'a> {
    fn from(rule: &'a CompiledRule) -> Self {
        Self::Compiled(rule)
    }
}

// ============================================================================
// SECTION: Evaluation Scope
// ============================================================================

/// Engine and caller context visible to converters and functions.
#[derive(Clone, Copy)]
pub struct EvalScope<'a> {
    /// Engine running the evaluation.
    engine: &'a RuleEngine,
    /// Caller-supplied context.
    context: &'a Context,
}

impl<'a> EvalScope<'a> {
    /// Creates a scope.
    #[must_use]
    pub const fn new(engine: &'a RuleEngine, context: &'a Context) -> Self {
        Self {
            engine,
            context,
        }
    }

    /// Returns the engine.
    #[must_use]
    pub const fn engine(&self) -> &'a RuleEngine {
        self.engine
    }

    /// Returns the caller's context.
    #[must_use]
    pub const fn context(&self) -> &'a Context {
        self.context
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Rule compiler, evaluator, and formatter bound to one registry.
pub struct RuleEngine {
    /// Registered rule types.
    registry: RuleRegistry,
    /// Compile limits.
    limits: CompileLimits,
    /// Mixed-connective handling.
    mixed_connectives: MixedConnectivePolicy,
    /// Audit sink.
    audit: Arc<dyn RuleAuditSink>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine {
    /// Creates an engine with an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(RuleRegistry::new())
    }

    /// Creates an engine with the built-in types.
    #[must_use]
    pub fn with_builtin_types() -> Self {
        Self::with_registry(RuleRegistry::with_builtin_types())
    }

    /// Creates an engine over an existing registry.
    #[must_use]
    pub fn with_registry(registry: RuleRegistry) -> Self {
        Self {
            registry,
            limits: CompileLimits::default(),
            mixed_connectives: MixedConnectivePolicy::default(),
            audit: Arc::new(NoopAuditSink),
        }
    }

    /// Sets compile limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: CompileLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Sets the mixed-connective policy.
    #[must_use]
    pub const fn with_mixed_connectives(mut self, policy: MixedConnectivePolicy) -> Self {
        self.mixed_connectives = policy;
        self
    }

    /// Sets the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn RuleAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Registers a rule type, replacing any with the same name.
    pub fn register_type(&mut self, definition: RuleTypeDefinition) {
        self.registry.register(definition);
    }

    /// Returns the registry.
    #[must_use]
    pub const fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Returns the compile limits.
    #[must_use]
    pub const fn limits(&self) -> &CompileLimits {
        &self.limits
    }

    /// Returns the mixed-connective policy.
    #[must_use]
    pub const fn mixed_connectives(&self) -> MixedConnectivePolicy {
        self.mixed_connectives
    }

    // ========================================================================
    // SECTION: Operations
    // ========================================================================

    /// Compiles rule text and checks every leaf against the registry.
    ///
    /// # Errors
    /// Returns [`RuleError::InvalidRule`] for malformed text, unknown types or
    /// functions, wrong argument counts, or mixed connectives under
    /// [`MixedConnectivePolicy::Deny`].
    pub fn compile_rule(&self, text: &str) -> RuleResult<CompiledRule> {
        let rule = compile_with_limits(text, &self.limits)?;

        if rule.any_mixed_connectives() {
            match self.mixed_connectives {
                MixedConnectivePolicy::Allow => {}
                MixedConnectivePolicy::Warn => self.audit.record(&RuleAuditEvent::warning(
                    rule.total_leaves(),
                    "rule mixes `&&` and `||` without parentheses; checks group left to right",
                )),
                MixedConnectivePolicy::Deny => return Err(CompileError::MixedConnectives.into()),
            }
        }

        self.check_leaves(&rule)?;
        self.audit.record(&RuleAuditEvent::compiled(rule.total_leaves()));
        Ok(rule)
    }

    /// Validates raw text; every leaf runs its converter.
    ///
    /// # Errors
    /// Returns [`RuleError::InvalidRule`] or [`RuleError::MissingData`] when
    /// the rule cannot be evaluated. Input failures are in the outcome.
    pub fn parse<'r>(
        &self,
        rule: impl Into<RuleRef<'r>>,
        raw: &str,
        context: &Context,
    ) -> RuleResult<ValidationOutcome> {
        self.evaluate(rule.into(), Input::Raw(raw), context)
    }

    /// Validates an already-typed value; converters are skipped and each
    /// leaf checks the value's kind instead.
    ///
    /// # Errors
    /// Returns [`RuleError::InvalidRule`] or [`RuleError::MissingData`] when
    /// the rule cannot be evaluated. Input failures are in the outcome.
    pub fn parse_typed<'r>(
        &self,
        rule: impl Into<RuleRef<'r>>,
        value: &Value,
        context: &Context,
    ) -> RuleResult<ValidationOutcome> {
        self.evaluate(rule.into(), Input::Typed(value), context)
    }

    /// Describes what a rule expects.
    ///
    /// # Errors
    /// Returns [`RuleError::InvalidRule`] when rule text fails to compile.
    pub fn describe_rule<'r>(&self, rule: impl Into<RuleRef<'r>>) -> RuleResult<String> {
        let compiled = self.resolve(rule.into())?;
        Ok(describe(&self.registry, &compiled))
    }

    /// Formats a value with a rule type's formatter.
    ///
    /// # Errors
    /// Returns [`RuleError::InvalidRule`] when the type is unknown.
    pub fn format_value(&self, type_name: &str, value: &Value) -> RuleResult<String> {
        Ok(self.registry.resolve(type_name)?.format(value))
    }

    // ========================================================================
    // SECTION: Internals
    // ========================================================================

    /// Runs the tree evaluator and records the outcome.
    fn evaluate(
        &self,
        rule: RuleRef<'_>,
        input: Input<'_>,
        context: &Context,
    ) -> RuleResult<ValidationOutcome> {
        let compiled = self.resolve(rule)?;
        let scope = EvalScope::new(self, context);
        let outcome = validate(&scope, &compiled, input)?;
        self.audit.record(&RuleAuditEvent::validated(
            input.mode(),
            compiled.total_leaves(),
            outcome.is_valid(),
            outcome.errors().len(),
        ));
        Ok(outcome)
    }

    /// Compiles text or checks the structure of a pre-compiled rule.
    fn resolve<'r>(&self, rule: RuleRef<'r>) -> RuleResult<Cow<'r, CompiledRule>> {
        match rule {
            RuleRef::Text(text) => self.compile_rule(text).map(Cow::Owned),
            RuleRef::Compiled(compiled) => {
                compiled.check_structure().map_err(RuleError::invalid_rule)?;
                Ok(Cow::Borrowed(compiled))
            }
        }
    }

    /// Checks every leaf, sub-expressions included, against the registry.
    fn check_leaves(&self, rule: &CompiledRule) -> RuleResult<()> {
        for leaf in rule.leaves() {
            match leaf {
                Leaf::Check(text) => {
                    check_leaf(&self.registry, text)?;
                }
                Leaf::Nested(nested) => self.check_leaves(nested)?,
            }
        }
        Ok(())
    }
}
