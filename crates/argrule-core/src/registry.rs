// crates/argrule-core/src/registry.rs
// ============================================================================
// Module: Rule Type Registry
// Description: Named rule types, their converters, and refinement functions.
// Purpose: Resolve check type and function names to behavior.
// Dependencies: serde_json, crate::{engine, error, value}
// ============================================================================

//! ## Overview
//! The registry maps a lower-cased type name to a [`RuleTypeDefinition`]. A
//! definition bundles a [`Converter`] (raw text to value), the value kinds it
//! accepts for already-typed input, required context keys, an optional
//! [`ValueFormatter`], and its [`FunctionDefinition`]s. Registration happens
//! at startup; evaluation only reads.
//!
//! Converters, functions, and formatters are traits with blanket impls for
//! plain functions, so built-ins and extensions are written the same way.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Number;
use serde_json::Value;

use crate::engine::EvalScope;
use crate::error::RuleError;
use crate::error::RuleResult;
use crate::value::ValueKind;
use crate::value::display_value;

// ============================================================================
// SECTION: Behavior Traits
// ============================================================================

/// Converts raw text into a typed value.
pub trait Converter: Send + Sync {
    /// Converts `raw`, failing with [`RuleError::InvalidData`] when it cannot.
    ///
    /// # Errors
    /// Returns [`RuleError`] when conversion fails.
    fn convert(&self, raw: &str, scope: &EvalScope<'_>) -> RuleResult<Value>;
}

impl<F> Converter for F
where
    F: Fn(&str, &EvalScope<'_>) -> RuleResult<Value> + Send + Sync,
{
    fn convert(&self, raw: &str, scope: &EvalScope<'_>) -> RuleResult<Value> {
        (self)(raw, scope)
    }
}

/// Refinement applied to a converted value.
///
/// Returning `Ok(None)` leaves the value unchanged; `Ok(Some(next))` replaces it.
pub trait RuleFunction: Send + Sync {
    /// Applies the function to `value` with coerced `args`.
    ///
    /// # Errors
    /// Returns [`RuleError::InvalidData`] when the value fails the check.
    fn apply(
        &self,
        value: &Value,
        args: &[Value],
        scope: &EvalScope<'_>,
    ) -> RuleResult<Option<Value>>;
}

impl<F> RuleFunction for F
where
    F: Fn(&Value, &[Value], &EvalScope<'_>) -> RuleResult<Option<Value>> + Send + Sync,
{
    fn apply(
        &self,
        value: &Value,
        args: &[Value],
        scope: &EvalScope<'_>,
    ) -> RuleResult<Option<Value>> {
        (self)(value, args, scope)
    }
}

/// Renders a value of a rule type back into text.
pub trait ValueFormatter: Send + Sync {
    /// Formats `value`.
    fn format(&self, value: &Value) -> String;
}

impl<F> ValueFormatter for F
where
    F: Fn(&Value) -> String + Send + Sync,
{
    fn format(&self, value: &Value) -> String {
        (self)(value)
    }
}

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Type an argument literal is coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Signed 64-bit integer.
    Integer,
    /// Finite floating point number.
    Float,
    /// Boolean (`true`/`false`).
    Bool,
    /// Text, kept as written.
    String,
}

impl ArgKind {
    /// Coerces literal argument text into this kind.
    #[must_use]
    pub fn coerce(self, text: &str) -> Option<Value> {
        match self {
            Self::Integer => text.trim().parse::<i64>().ok().map(Value::from),
            Self::Float => text
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            Self::Bool => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            Self::String => Some(Value::String(text.to_string())),
        }
    }
}

/// Accepted arguments for a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgSpec {
    /// Exactly one argument per entry; each entry lists the kinds tried in order.
    Fixed(Vec<Vec<ArgKind>>),
    /// Any number of arguments, all coerced to one kind.
    Variadic(ArgKind),
}

impl ArgSpec {
    /// Spec for functions that take no arguments.
    #[must_use]
    pub const fn none() -> Self {
        Self::Fixed(Vec::new())
    }

    /// Spec for `count` arguments of a single kind.
    #[must_use]
    pub fn fixed(kind: ArgKind, count: usize) -> Self {
        Self::Fixed(vec![vec![kind]; count])
    }

    /// Verifies the argument count.
    ///
    /// # Errors
    /// Returns [`RuleError::InvalidRule`] on an arity mismatch.
    pub fn check_arity(&self, function: &str, count: usize) -> RuleResult<()> {
        match self {
            Self::Fixed(specs) if specs.len() != count => {
                let expected = specs.len();
                Err(RuleError::invalid_rule(format!(
                    "function {function} requires {expected} argument{}",
                    if expected == 1 { "" } else { "s" }
                )))
            }
            Self::Fixed(_) | Self::Variadic(_) => Ok(()),
        }
    }

    /// Checks arity and coerces every argument.
    ///
    /// # Errors
    /// Returns [`RuleError::InvalidRule`] on an arity mismatch and
    /// [`RuleError::MissingData`] when an argument cannot be coerced.
    pub fn coerce(&self, function: &str, args: &[String]) -> RuleResult<Vec<Value>> {
        self.check_arity(function, args.len())?;
        args.iter()
            .enumerate()
            .map(|(index, arg)| {
                let coerced = match self {
                    Self::Fixed(specs) => {
                        specs.get(index).and_then(|kinds| kinds.iter().find_map(|k| k.coerce(arg)))
                    }
                    Self::Variadic(kind) => kind.coerce(arg),
                };
                coerced.ok_or_else(|| {
                    RuleError::missing_data(format!(
                        "function {function}'s {index}-index argument is of the wrong type"
                    ))
                })
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Definitions
// ============================================================================

/// A refinement function belonging to one rule type.
pub struct FunctionDefinition {
    /// Lower-cased function name.
    name: String,
    /// Description template with `%0`, `%1`, ... and `%all` placeholders.
    describe: String,
    /// Accepted arguments.
    args: ArgSpec,
    /// Behavior.
    function: Box<dyn RuleFunction>,
}

impl FunctionDefinition {
    /// Creates a function definition.
    pub fn new(
        name: impl Into<String>,
        describe: impl Into<String>,
        args: ArgSpec,
        function: impl RuleFunction + 'static,
    ) -> Self {
        Self {
            name: name.into().to_lowercase(),
            describe: describe.into(),
            args,
            function: Box::new(function),
        }
    }

    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description template.
    #[must_use]
    pub fn describe(&self) -> &str {
        &self.describe
    }

    /// Returns the accepted arguments.
    #[must_use]
    pub const fn args(&self) -> &ArgSpec {
        &self.args
    }

    /// Applies the function.
    ///
    /// # Errors
    /// Propagates the function's [`RuleError`].
    pub fn apply(
        &self,
        value: &Value,
        args: &[Value],
        scope: &EvalScope<'_>,
    ) -> RuleResult<Option<Value>> {
        self.function.apply(value, args, scope)
    }
}

/// A named rule type.
pub struct RuleTypeDefinition {
    /// Lower-cased type name.
    name: String,
    /// Description template.
    describe: String,
    /// Kinds accepted as already-typed input.
    valid_kinds: Vec<ValueKind>,
    /// Context keys the type needs, with the kinds each may hold.
    required_context: BTreeMap<String, Vec<ValueKind>>,
    /// Raw text converter.
    converter: Box<dyn Converter>,
    /// Optional value formatter.
    formatter: Option<Box<dyn ValueFormatter>>,
    /// Functions keyed by lower-cased name.
    functions: BTreeMap<String, FunctionDefinition>,
}

impl RuleTypeDefinition {
    /// Creates a type definition with no functions or context requirements.
    pub fn new(
        name: impl Into<String>,
        describe: impl Into<String>,
        converter: impl Converter + 'static,
    ) -> Self {
        Self {
            name: name.into().to_lowercase(),
            describe: describe.into(),
            valid_kinds: Vec::new(),
            required_context: BTreeMap::new(),
            converter: Box::new(converter),
            formatter: None,
            functions: BTreeMap::new(),
        }
    }

    /// Accepts already-typed input of `kind`.
    #[must_use]
    pub fn accepts(mut self, kind: ValueKind) -> Self {
        if !self.valid_kinds.contains(&kind) {
            self.valid_kinds.push(kind);
        }
        self
    }

    /// Requires `key` in the caller's context, holding one of `kinds`
    /// (any kind when empty).
    #[must_use]
    pub fn requires_context(
        mut self,
        key: impl Into<String>,
        kinds: impl IntoIterator<Item = ValueKind>,
    ) -> Self {
        self.required_context.insert(key.into(), kinds.into_iter().collect());
        self
    }

    /// Sets the value formatter.
    #[must_use]
    pub fn with_formatter(mut self, formatter: impl ValueFormatter + 'static) -> Self {
        self.formatter = Some(Box::new(formatter));
        self
    }

    /// Adds a function, replacing any with the same name.
    #[must_use]
    pub fn with_function(mut self, function: FunctionDefinition) -> Self {
        self.functions.insert(function.name.clone(), function);
        self
    }

    /// Returns the type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description template.
    #[must_use]
    pub fn describe(&self) -> &str {
        &self.describe
    }

    /// Returns true when already-typed input of `kind` is accepted.
    #[must_use]
    pub fn accepts_kind(&self, kind: ValueKind) -> bool {
        self.valid_kinds.contains(&kind)
    }

    /// Returns the required context keys.
    #[must_use]
    pub const fn required_context(&self) -> &BTreeMap<String, Vec<ValueKind>> {
        &self.required_context
    }

    /// Looks up a function by name, case-insensitively.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(&name.to_lowercase())
    }

    /// Iterates over the functions in name order.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDefinition> {
        self.functions.values()
    }

    /// Runs the converter.
    ///
    /// # Errors
    /// Propagates the converter's [`RuleError`].
    pub fn convert(&self, raw: &str, scope: &EvalScope<'_>) -> RuleResult<Value> {
        self.converter.convert(raw, scope)
    }

    /// Formats a value, falling back to its plain text rendering.
    #[must_use]
    pub fn format(&self, value: &Value) -> String {
        self.formatter
            .as_ref()
            .map_or_else(|| display_value(value), |formatter| formatter.format(value))
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry of rule types keyed by lower-cased name.
#[derive(Default)]
pub struct RuleRegistry {
    /// Type definitions keyed by name.
    types: BTreeMap<String, RuleTypeDefinition>,
}

impl RuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in types registered.
    #[must_use]
    pub fn with_builtin_types() -> Self {
        let mut registry = Self::new();
        crate::builtins::register_builtin_types(&mut registry);
        registry
    }

    /// Registers a type, replacing any with the same name.
    pub fn register(&mut self, definition: RuleTypeDefinition) {
        self.types.insert(definition.name.clone(), definition);
    }

    /// Looks up a type by name, case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RuleTypeDefinition> {
        self.types.get(&name.to_lowercase())
    }

    /// Looks up a type, failing with [`RuleError::InvalidRule`] when unknown.
    ///
    /// # Errors
    /// Returns [`RuleError::InvalidRule`] for unregistered names.
    pub fn resolve(&self, name: &str) -> RuleResult<&RuleTypeDefinition> {
        self.get(name)
            .ok_or_else(|| RuleError::invalid_rule(format!("rule type {name} doesn't exist")))
    }

    /// Iterates over registered type names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}
