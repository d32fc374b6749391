// crates/argrule-core/src/formatter.rs
// ============================================================================
// Module: Rule Formatter
// Description: Renders compiled rules as human-readable descriptions.
// Purpose: Tell users what a rule expects, e.g. when a config value fails.
// Dependencies: crate::{check, compiler, registry}
// ============================================================================

//! ## Overview
//! Each leaf renders as its type's template followed by its functions'
//! templates, comma separated: `str[len(2,5) & alnum]` becomes
//! `a string between 2 and 5 characters, alphanumeric`. Leaves are emitted one
//! per line in group order; the second leaf of a `Combine` group is prefixed
//! with `and` or `or`. Sub-expressions render on a single line.
//!
//! Rendering never fails. Types or functions missing from the registry fall
//! back to a generic description so a rule loaded from a cache can still be
//! shown.

use crate::check::parse_check;
use crate::compiler::CompiledRule;
use crate::compiler::Group;
use crate::compiler::Leaf;
use crate::registry::RuleRegistry;

// ============================================================================
// SECTION: Templates
// ============================================================================

/// Substitutes `%0`, `%1`, ... and `%all` in a description template.
///
/// Higher indices are replaced first so `%1` never clobbers part of `%10`.
#[must_use]
pub fn render_template(template: &str, args: &[String]) -> String {
    let mut rendered = template.to_string();
    for (index, arg) in args.iter().enumerate().rev() {
        rendered = rendered.replace(&format!("%{index}"), arg);
    }
    rendered.replace("%all", &args.join(", "))
}

/// Generic description for a type without a template: `A str`, `An int`.
fn fallback_type_description(name: &str) -> String {
    let article = if name.starts_with(['a', 'e', 'i', 'o', 'u']) { "An" } else { "A" };
    format!("{article} {name}")
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Describes a compiled rule, one line per leaf.
#[must_use]
pub fn describe(registry: &RuleRegistry, rule: &CompiledRule) -> String {
    let parts: Vec<String> = rule.leaves().iter().map(|leaf| describe_leaf(registry, leaf)).collect();

    let mut added = vec![false; parts.len()];
    let mut lines = Vec::new();
    for group in rule.groups() {
        match group {
            Group::Solo {
                leaf,
            } => {
                if let Some(part) = parts.get(*leaf) {
                    lines.push(part.clone());
                }
                if let Some(flag) = added.get_mut(*leaf) {
                    *flag = true;
                }
            }
            Group::Combine {
                connective,
                leaves,
            } => {
                for index in leaves {
                    let (Some(part), Some(flag)) = (parts.get(*index), added.get_mut(*index)) else {
                        continue;
                    };
                    if *flag {
                        continue;
                    }
                    if *index == 0 {
                        lines.push(part.clone());
                    } else {
                        lines.push(format!("{} {part}", connective.word()));
                    }
                    *flag = true;
                }
            }
        }
    }
    lines.join("\n")
}

/// Describes a single leaf.
fn describe_leaf(registry: &RuleRegistry, leaf: &Leaf) -> String {
    match leaf {
        Leaf::Nested(nested) => describe(registry, nested).replace('\n', " "),
        Leaf::Check(text) => describe_check(registry, text),
    }
}

/// Describes a check from its type and function templates.
fn describe_check(registry: &RuleRegistry, text: &str) -> String {
    let Ok(check) = parse_check(text) else {
        return text.to_string();
    };
    let rule_type = registry.get(&check.type_name);
    let detail = rule_type.map_or_else(
        || fallback_type_description(&check.type_name),
        |definition| definition.describe().to_string(),
    );

    let extras: Vec<String> = check
        .calls
        .iter()
        .map(|call| {
            rule_type.and_then(|definition| definition.function(&call.name)).map_or_else(
                || {
                    if call.args.is_empty() {
                        call.name.clone()
                    } else {
                        format!("{}({})", call.name, call.args.join(", "))
                    }
                },
                |function| render_template(function.describe(), &call.args),
            )
        })
        .collect();

    if extras.is_empty() { detail } else { format!("{detail} {}", extras.join(", ")) }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
