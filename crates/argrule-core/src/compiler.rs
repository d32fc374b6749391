// crates/argrule-core/src/compiler.rs
// ============================================================================
// Module: Rule Expression Compiler
// Description: Turns rule text into an immutable `CompiledRule` tree.
// Purpose: Split expressions on top-level connectives, record captures, and
//          compile parenthesized sub-expressions into nested trees.
// Dependencies: serde, crate::error
// ============================================================================

//! ## Overview
//! A rule expression is a chain of checks joined by `&&` or `||`. The compiler
//! scans left to right and splits at the *leftmost* top-level connective, one
//! step at a time. There is no precedence between `&&` and `||`: the chain
//! `a && b || c` becomes the groups `Combine(And, [0, 1])` and
//! `Combine(Or, [1, 2])`. Parentheses are the only way to force a subtree.
//!
//! ### Grammar (informal)
//! - **Check**: `type`, `type[fn]`, `type[fn1 & fn2(a, b)]`
//! - **Capture**: `@check` marks the check whose value is the rule's result
//! - **Connectives**: `check && check`, `check || check`
//! - **Grouping**: `( ... )`
//! - **Escapes**: `\x` takes `x` literally, so `\(` never opens a group
//!
//! ### Example
//!
//! ```
//! use argrule_core::compiler::Connective;
//! use argrule_core::compiler::Group;
//! use argrule_core::compiler::compile;
//!
//! let rule = compile("str && @int[between(1,10)]").unwrap();
//! assert_eq!(rule.leaves().len(), 2);
//! assert_eq!(rule.capture(), Some(1));
//! assert_eq!(rule.groups(), &[Group::Combine { connective: Connective::And, leaves: [0, 1] }]);
//! ```

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::error::CompileError;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default maximum rule text size in bytes.
pub const DEFAULT_MAX_RULE_BYTES: usize = 64 * 1024;
/// Default maximum sub-expression nesting depth.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 32;

/// Hard limits applied while compiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileLimits {
    /// Maximum rule text size in bytes.
    pub max_rule_bytes: usize,
    /// Maximum sub-expression nesting depth.
    pub max_nesting_depth: usize,
}

impl Default for CompileLimits {
    fn default() -> Self {
        Self {
            max_rule_bytes: DEFAULT_MAX_RULE_BYTES,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

// ============================================================================
// SECTION: Tree Types
// ============================================================================

/// Boolean connective joining two checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connective {
    /// `&&`
    And,
    /// `||`
    Or,
}

impl Connective {
    /// Returns the two-character token.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    /// Returns the word used in descriptions.
    #[must_use]
    pub const fn word(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// A single entry of a compiled rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leaf {
    /// Raw check text such as `int[between(1,5)]`.
    Check(String),
    /// Parenthesized sub-expression compiled into its own tree.
    Nested(Box<CompiledRule>),
}

impl Leaf {
    /// Returns the check text when this leaf is not a sub-expression.
    #[must_use]
    pub fn as_check(&self) -> Option<&str> {
        match self {
            Self::Check(text) => Some(text),
            Self::Nested(_) => None,
        }
    }

    /// Returns the nested tree when this leaf is a sub-expression.
    #[must_use]
    pub fn as_nested(&self) -> Option<&CompiledRule> {
        match self {
            Self::Check(_) => None,
            Self::Nested(rule) => Some(rule),
        }
    }
}

/// Boolean combination node referencing leaves by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Group {
    /// A single leaf standing alone.
    Solo {
        /// Index of the leaf.
        leaf: usize,
    },
    /// Two adjacent leaves joined by a connective.
    Combine {
        /// Connective applied to the two leaves.
        connective: Connective,
        /// This group's own leaf and the leaf that follows it.
        leaves: [usize; 2],
    },
}

impl Group {
    /// Returns the leaf indices referenced by this group.
    #[must_use]
    pub fn leaf_indices(&self) -> &[usize] {
        match self {
            Self::Solo {
                leaf,
            } => std::slice::from_ref(leaf),
            Self::Combine {
                leaves, ..
            } => leaves,
        }
    }
}

/// Compiled rule tree.
///
/// # Invariants
/// - Every index referenced by `groups` exists in `leaves`.
/// - `capture`, when set, refers to a leaf.
/// - Nested trees number their leaves independently of the parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledRule {
    /// Leaves in discovery order.
    leaves: Vec<Leaf>,
    /// Groups in evaluation order.
    groups: Vec<Group>,
    /// Index of the `@`-captured leaf.
    capture: Option<usize>,
}

impl CompiledRule {
    /// Returns the leaves in discovery order.
    #[must_use]
    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    /// Returns the groups in evaluation order.
    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Returns the index of the captured leaf, if any.
    #[must_use]
    pub const fn capture(&self) -> Option<usize> {
        self.capture
    }

    /// Returns the leaf at `index`.
    #[must_use]
    pub fn leaf(&self, index: usize) -> Option<&Leaf> {
        self.leaves.get(index)
    }

    /// Returns true when this level chains both `&&` and `||`.
    #[must_use]
    pub fn mixes_connectives(&self) -> bool {
        let mut seen_and = false;
        let mut seen_or = false;
        for group in &self.groups {
            if let Group::Combine {
                connective, ..
            } = group
            {
                match connective {
                    Connective::And => seen_and = true,
                    Connective::Or => seen_or = true,
                }
            }
        }
        seen_and && seen_or
    }

    /// Returns true when this tree or any sub-expression mixes connectives.
    #[must_use]
    pub fn any_mixed_connectives(&self) -> bool {
        self.mixes_connectives()
            || self.leaves.iter().filter_map(Leaf::as_nested).any(Self::any_mixed_connectives)
    }

    /// Counts leaves across this tree and every sub-expression.
    #[must_use]
    pub fn total_leaves(&self) -> usize {
        self.leaves
            .iter()
            .map(|leaf| match leaf {
                Leaf::Check(_) => 1,
                Leaf::Nested(rule) => rule.total_leaves(),
            })
            .sum()
    }

    /// Checks the structural invariants of a tree obtained from outside the
    /// compiler, such as a deserialized cache entry.
    ///
    /// # Errors
    /// Returns a message naming the first broken invariant.
    pub fn check_structure(&self) -> Result<(), String> {
        if self.groups.is_empty() {
            return Err("compiled rule has no groups".to_string());
        }
        for group in &self.groups {
            for index in group.leaf_indices() {
                if *index >= self.leaves.len() {
                    return Err(format!("group references missing leaf {index}"));
                }
            }
        }
        if let Some(capture) = self.capture
            && capture >= self.leaves.len()
        {
            return Err(format!("capture references missing leaf {capture}"));
        }
        for leaf in &self.leaves {
            if let Leaf::Nested(rule) = leaf {
                rule.check_structure()?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for CompiledRule {
    /// Renders the canonical rule text; compiling it yields an equal tree.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_leaf = |f: &mut fmt::Formatter<'_>, index: usize| -> fmt::Result {
            if self.capture == Some(index) {
                f.write_str("@")?;
            }
            match self.leaves.get(index) {
                Some(Leaf::Check(text)) => f.write_str(text),
                Some(Leaf::Nested(rule)) => write!(f, "({rule})"),
                None => Ok(()),
            }
        };

        write_leaf(f, 0)?;
        for group in &self.groups {
            if let Group::Combine {
                connective,
                leaves,
            } = group
            {
                write!(f, " {} ", connective.token())?;
                write_leaf(f, leaves[1])?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Public API
// ============================================================================

/// Compiles rule text with the default limits.
///
/// # Errors
/// Returns [`CompileError`] for empty input, unbalanced parentheses or
/// brackets, empty checks, repeated captures, or exceeded limits.
pub fn compile(expr: &str) -> Result<CompiledRule, CompileError> {
    compile_with_limits(expr, &CompileLimits::default())
}

/// Compiles rule text with explicit limits.
///
/// # Errors
/// Returns [`CompileError`] for empty input, unbalanced parentheses or
/// brackets, empty checks, repeated captures, or exceeded limits.
pub fn compile_with_limits(
    expr: &str,
    limits: &CompileLimits,
) -> Result<CompiledRule, CompileError> {
    if expr.len() > limits.max_rule_bytes {
        return Err(CompileError::InputTooLarge {
            max_bytes: limits.max_rule_bytes,
            actual_bytes: expr.len(),
        });
    }
    check_balance(expr)?;
    compile_at_depth(expr, limits, 1)
}

// ============================================================================
// SECTION: Compilation Passes
// ============================================================================

/// Compiles one (sub-)expression, recursing into parenthesized leaves.
fn compile_at_depth(
    expr: &str,
    limits: &CompileLimits,
    depth: usize,
) -> Result<CompiledRule, CompileError> {
    if depth > limits.max_nesting_depth {
        return Err(CompileError::NestingTooDeep {
            max_depth: limits.max_nesting_depth,
            actual_depth: depth,
        });
    }

    let text = strip_wrapping_parens(expr);
    if text.is_empty() {
        return Err(CompileError::EmptyInput);
    }

    let flat = split_chain(text)?;
    let mut leaves = Vec::with_capacity(flat.leaves.len());
    for raw in flat.leaves {
        let inner = strip_wrapping_parens(raw);
        if find_separator(inner).is_some() {
            leaves.push(Leaf::Nested(Box::new(compile_at_depth(inner, limits, depth + 1)?)));
        } else {
            leaves.push(Leaf::Check(inner.to_string()));
        }
    }

    Ok(CompiledRule {
        leaves,
        groups: flat.groups,
        capture: flat.capture,
    })
}

/// Output of a single left-to-right splitting pass.
struct FlatChain<'a> {
    /// Raw leaf text, capture markers removed.
    leaves: Vec<&'a str>,
    /// Groups in discovery order.
    groups: Vec<Group>,
    /// Captured leaf index.
    capture: Option<usize>,
}

/// Splits an expression at its top-level connectives, leftmost first.
fn split_chain(text: &str) -> Result<FlatChain<'_>, CompileError> {
    let mut chain = FlatChain {
        leaves: Vec::new(),
        groups: Vec::new(),
        capture: None,
    };
    let mut rest = text;
    let mut offset = 0usize;

    loop {
        let Some((position, connective)) = find_separator(rest) else {
            if chain.groups.is_empty() {
                chain.groups.push(Group::Solo {
                    leaf: chain.leaves.len(),
                });
            }
            push_leaf(&mut chain, rest, offset)?;
            return Ok(chain);
        };

        let before = &rest[.. position];
        let index = chain.leaves.len();
        push_leaf(&mut chain, before, offset)?;
        chain.groups.push(Group::Combine {
            connective,
            leaves: [index, index + 1],
        });

        rest = &rest[position + 2 ..];
        offset += position + 2;
    }
}

/// Records one leaf, stripping and registering an `@` capture marker.
fn push_leaf<'a>(
    chain: &mut FlatChain<'a>,
    raw: &'a str,
    offset: usize,
) -> Result<(), CompileError> {
    let mut text = raw.trim();
    let inner = strip_wrapping_parens(text);
    let marked = text
        .strip_prefix('@')
        .or_else(|| find_separator(inner).is_none().then(|| inner.strip_prefix('@')).flatten());
    if let Some(stripped) = marked {
        if chain.capture.is_some() {
            return Err(CompileError::MultipleCaptures {
                position: offset,
            });
        }
        chain.capture = Some(chain.leaves.len());
        text = stripped.trim();
    }
    if strip_wrapping_parens(text).is_empty() {
        return Err(CompileError::EmptyCheck {
            position: offset,
        });
    }
    chain.leaves.push(text);
    Ok(())
}

// ============================================================================
// SECTION: Scanning Helpers
// ============================================================================

/// Verifies that parentheses and brackets nest correctly.
fn check_balance(expr: &str) -> Result<(), CompileError> {
    let bytes = expr.as_bytes();
    let mut open: Vec<(u8, usize)> = Vec::new();
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'\\' => index += 1,
            byte @ (b'(' | b'[') => open.push((byte, index)),
            b')' => match open.pop() {
                Some((b'(', _)) => {}
                _ => {
                    return Err(CompileError::UnbalancedParenthesis {
                        position: index,
                    });
                }
            },
            b']' => match open.pop() {
                Some((b'[', _)) => {}
                _ => {
                    return Err(CompileError::UnbalancedBracket {
                        position: index,
                    });
                }
            },
            _ => {}
        }
        index += 1;
    }

    match open.pop() {
        None => Ok(()),
        Some((b'(', position)) => Err(CompileError::UnbalancedParenthesis {
            position,
        }),
        Some((_, position)) => Err(CompileError::UnbalancedBracket {
            position,
        }),
    }
}

/// Finds the leftmost `&&` or `||` outside parentheses and brackets.
pub(crate) fn find_separator(text: &str) -> Option<(usize, Connective)> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'\\' => index += 1,
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b'&' if depth == 0 && bytes.get(index + 1) == Some(&b'&') => {
                return Some((index, Connective::And));
            }
            b'|' if depth == 0 && bytes.get(index + 1) == Some(&b'|') => {
                return Some((index, Connective::Or));
            }
            _ => {}
        }
        index += 1;
    }
    None
}

/// Trims and removes parentheses that wrap the entire string, repeatedly.
pub(crate) fn strip_wrapping_parens(text: &str) -> &str {
    let mut current = text.trim();
    while current.starts_with('(') && closing_paren(current) == Some(current.len() - 1) {
        current = current[1 .. current.len() - 1].trim();
    }
    current
}

/// Returns the index of the `)` matching a leading `(`.
fn closing_paren(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'\\' => index += 1,
            b'(' => depth += 1,
            b')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
        index += 1;
    }
    None
}
