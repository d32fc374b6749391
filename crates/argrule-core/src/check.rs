// crates/argrule-core/src/check.rs
// ============================================================================
// Module: Leaf Check Syntax
// Description: Dissects `type[fn1 & fn2(a, b)]` check text.
// Purpose: Share one parser between evaluation, registry checks, and describe.
// Dependencies: crate::error
// ============================================================================

//! ## Overview
//! A check names a rule type and an optional bracket clause of function
//! invocations. Invocations are separated by `&`; arguments by `,` (a bare `&`
//! inside a call's parentheses also separates arguments). Both splits ignore
//! `&&` and separators nested inside parentheses or brackets, which lets an argument
//! carry a whole nested rule such as `value(int[between(1,5)])`. A backslash
//! takes the next character literally.

use crate::error::RuleError;
use crate::error::RuleResult;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A dissected leaf check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafCheck {
    /// Lower-cased rule type name.
    pub type_name: String,
    /// Function invocations in application order.
    pub calls: Vec<FunctionCall>,
}

/// A single function invocation inside a bracket clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    /// Lower-cased function name.
    pub name: String,
    /// Argument text, trimmed, with its own escapes resolved.
    pub args: Vec<String>,
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses check text into its type name and function invocations.
///
/// # Errors
/// Returns [`RuleError::InvalidRule`] for an unmatched `[` or `(`, an empty
/// type name, or an empty invocation.
pub fn parse_check(text: &str) -> RuleResult<LeafCheck> {
    let text = text.trim();
    let Some(open) = find_unescaped(text, b'[') else {
        return Ok(LeafCheck {
            type_name: type_name(text)?,
            calls: Vec::new(),
        });
    };

    let clause = &text[open + 1 ..];
    let Some(inner) = clause.strip_suffix(']') else {
        return Err(RuleError::invalid_rule("unmatched '['"));
    };

    let calls = split_top_level(inner, |byte| byte == b'&')
        .into_iter()
        .map(parse_call)
        .collect::<RuleResult<Vec<_>>>()?;

    Ok(LeafCheck {
        type_name: type_name(&text[.. open])?,
        calls,
    })
}

/// Normalizes and validates a type name.
fn type_name(raw: &str) -> RuleResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(RuleError::invalid_rule("check is missing a rule type"));
    }
    Ok(name.to_lowercase())
}

/// Parses a single `name` or `name(args)` invocation.
fn parse_call(raw: &str) -> RuleResult<FunctionCall> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(RuleError::invalid_rule("empty function in check"));
    }

    let Some(open) = find_unescaped(raw, b'(') else {
        return Ok(FunctionCall {
            name: raw.to_lowercase(),
            args: Vec::new(),
        });
    };

    let name = raw[.. open].trim().to_lowercase();
    let Some(body) = raw[open + 1 ..].strip_suffix(')') else {
        return Err(RuleError::invalid_rule(format!("unmatched ')' for function {name}")));
    };

    let args = if body.trim().is_empty() {
        Vec::new()
    } else {
        split_top_level(body, |byte| byte == b',' || byte == b'&')
            .into_iter()
            .map(|arg| unescape(arg.trim()))
            .collect()
    };

    Ok(FunctionCall {
        name,
        args,
    })
}

// ============================================================================
// SECTION: Scanning Helpers
// ============================================================================

/// Returns the byte offset of the first unescaped `target`.
fn find_unescaped(text: &str, target: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'\\' => index += 1,
            byte if byte == target => return Some(index),
            _ => {}
        }
        index += 1;
    }
    None
}

/// Splits at separator bytes that sit outside parentheses and brackets.
///
/// A doubled `&&` is a rule connective and never splits.
fn split_top_level(text: &str, is_separator: impl Fn(u8) -> bool) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'\\' => index += 1,
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b'&' if bytes.get(index + 1) == Some(&b'&') => index += 1,
            byte if depth == 0 && is_separator(byte) => {
                parts.push(&text[start .. index]);
                start = index + 1;
            }
            _ => {}
        }
        index += 1;
    }
    parts.push(&text[start ..]);
    parts
}

/// Resolves backslash escapes written at the argument's own level.
///
/// Escapes inside the argument's brackets or parentheses belong to a nested
/// rule and are kept so that rule resolves them when it is parsed.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0usize;
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if depth > 0 {
                    out.push(ch);
                }
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '(' | '[' => {
                depth += 1;
                out.push(ch);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}
