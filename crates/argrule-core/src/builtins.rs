// crates/argrule-core/src/builtins.rs
// ============================================================================
// Module: Built-in Rule Types
// Description: The `str`, `int`, `bool`, `url`, and `dict` rule types.
// Purpose: Ship a useful default catalog on top of the open registry.
// Dependencies: regex, serde_json, url, crate::{engine, registry}
// ============================================================================

//! ## Overview
//! Each built-in is an ordinary [`RuleTypeDefinition`] built from plain
//! functions. Nothing here is special-cased by the evaluator; callers can
//! replace any of them by registering a type with the same name.
//!
//! | Type   | Accepts | Functions                                   |
//! |--------|---------|---------------------------------------------|
//! | `str`  | string  | `len`, `includes`, `alnum`, `in`, `regex`   |
//! | `int`  | integer | `between`, `less`, `greater`                |
//! | `bool` | bool    | none                                        |
//! | `url`  | string  | none                                        |
//! | `dict` | map     | `key`, `value`                              |

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use serde_json::Map;
use serde_json::Value;

use crate::engine::EvalScope;
use crate::engine::RuleRef;
use crate::error::RuleError;
use crate::error::RuleResult;
use crate::registry::ArgKind;
use crate::registry::ArgSpec;
use crate::registry::FunctionDefinition;
use crate::registry::RuleRegistry;
use crate::registry::RuleTypeDefinition;
use crate::validator::ValidationOutcome;
use crate::value::ValueKind;
use crate::value::display_value;

// ============================================================================
// SECTION: Registration
// ============================================================================

/// Registers every built-in type.
pub fn register_builtin_types(registry: &mut RuleRegistry) {
    registry.register(string_type());
    registry.register(integer_type());
    registry.register(bool_type());
    registry.register(url_type());
    registry.register(dict_type());
}

/// Builds the `str` type.
#[must_use]
pub fn string_type() -> RuleTypeDefinition {
    RuleTypeDefinition::new("str", "a string", convert_str)
        .accepts(ValueKind::String)
        .with_function(FunctionDefinition::new(
            "len",
            "between %0 and %1 characters",
            ArgSpec::fixed(ArgKind::Integer, 2),
            str_len,
        ))
        .with_function(FunctionDefinition::new(
            "includes",
            "includes one of %all",
            ArgSpec::Variadic(ArgKind::String),
            str_includes,
        ))
        .with_function(FunctionDefinition::new(
            "alnum",
            "alphanumeric",
            ArgSpec::none(),
            str_alnum,
        ))
        .with_function(FunctionDefinition::new(
            "in",
            "one of %all",
            ArgSpec::Variadic(ArgKind::String),
            str_in,
        ))
        .with_function(FunctionDefinition::new(
            "regex",
            "matches regex %all",
            ArgSpec::Variadic(ArgKind::String),
            str_regex,
        ))
}

/// Builds the `int` type.
#[must_use]
pub fn integer_type() -> RuleTypeDefinition {
    RuleTypeDefinition::new("int", "an integer", convert_int)
        .accepts(ValueKind::Integer)
        .with_function(FunctionDefinition::new(
            "between",
            "between %0 and %1",
            ArgSpec::fixed(ArgKind::Integer, 2),
            int_between,
        ))
        .with_function(FunctionDefinition::new(
            "less",
            "below %0",
            ArgSpec::fixed(ArgKind::Integer, 1),
            int_less,
        ))
        .with_function(FunctionDefinition::new(
            "greater",
            "above %0",
            ArgSpec::fixed(ArgKind::Integer, 1),
            int_greater,
        ))
}

/// Builds the `bool` type.
#[must_use]
pub fn bool_type() -> RuleTypeDefinition {
    RuleTypeDefinition::new("bool", "a boolean", convert_bool)
        .accepts(ValueKind::Bool)
        .with_formatter(format_bool)
}

/// Builds the `url` type.
#[must_use]
pub fn url_type() -> RuleTypeDefinition {
    RuleTypeDefinition::new("url", "a url", convert_url).accepts(ValueKind::String)
}

/// Builds the `dict` type.
#[must_use]
pub fn dict_type() -> RuleTypeDefinition {
    RuleTypeDefinition::new("dict", "a dict", convert_dict)
        .accepts(ValueKind::Map)
        .with_formatter(format_dict)
        .with_function(FunctionDefinition::new(
            "key",
            "with keys matching rule %all",
            ArgSpec::Variadic(ArgKind::String),
            dict_key,
        ))
        .with_function(FunctionDefinition::new(
            "value",
            "with values matching rule %all",
            ArgSpec::Variadic(ArgKind::String),
            dict_value,
        ))
}

// ============================================================================
// SECTION: Argument Helpers
// ============================================================================

/// Reads a coerced integer argument.
fn int_arg(args: &[Value], index: usize) -> RuleResult<i64> {
    args.get(index).and_then(Value::as_i64).ok_or_else(|| {
        RuleError::missing_data(format!("{index}-index argument is not an integer"))
    })
}

/// Collects coerced string arguments.
fn str_args(args: &[Value]) -> Vec<&str> {
    args.iter().filter_map(Value::as_str).collect()
}

/// Reads the running value as text.
fn text_of(value: &Value) -> RuleResult<&str> {
    value.as_str().ok_or_else(|| RuleError::invalid_data("Value isn't a string"))
}

/// Reads the running value as an integer.
fn integer_of(value: &Value) -> RuleResult<i64> {
    value.as_i64().ok_or_else(|| RuleError::invalid_data("Value isn't an integer"))
}

// ============================================================================
// SECTION: str
// ============================================================================

/// Raw text is already a string.
fn convert_str(raw: &str, _scope: &EvalScope<'_>) -> RuleResult<Value> {
    Ok(Value::String(raw.to_string()))
}

/// Character count must fall within `[min, max]`.
fn str_len(value: &Value, args: &[Value], _scope: &EvalScope<'_>) -> RuleResult<Option<Value>> {
    let (min, max) = (int_arg(args, 0)?, int_arg(args, 1)?);
    let length = i64::try_from(text_of(value)?.chars().count()).unwrap_or(i64::MAX);
    if length < min || length > max {
        return Err(RuleError::invalid_data(format!(
            "Value's length isn't within bounds: {min} to {max}"
        )));
    }
    Ok(None)
}

/// At least one argument must appear in the value, ignoring case.
fn str_includes(
    value: &Value,
    args: &[Value],
    _scope: &EvalScope<'_>,
) -> RuleResult<Option<Value>> {
    let haystack = text_of(value)?.to_lowercase();
    let words = str_args(args);
    if words.iter().any(|word| haystack.contains(&word.to_lowercase())) {
        return Ok(None);
    }
    Err(RuleError::invalid_data(format!(
        "Value doesn't include any of required words: {}",
        words.join(", ")
    )))
}

/// Letters and digits only, with `-` and `_` allowed.
fn str_alnum(value: &Value, _args: &[Value], _scope: &EvalScope<'_>) -> RuleResult<Option<Value>> {
    let text = text_of(value)?;
    let mut significant = text.chars().filter(|ch| *ch != '-' && *ch != '_').peekable();
    if significant.peek().is_none() || !significant.all(char::is_alphanumeric) {
        return Err(RuleError::invalid_data("Value isn't alphanumeric"));
    }
    Ok(None)
}

/// Value must equal one of the arguments, ignoring case.
fn str_in(value: &Value, args: &[Value], _scope: &EvalScope<'_>) -> RuleResult<Option<Value>> {
    let needle = text_of(value)?.to_lowercase();
    let phrases: Vec<String> = str_args(args).into_iter().map(str::to_lowercase).collect();
    if phrases.contains(&needle) {
        return Ok(None);
    }
    Err(RuleError::invalid_data(format!(
        "Value isn't one of required phrases: {}",
        phrases.join(", ")
    )))
}

/// Every pattern must match at the start of the value.
fn str_regex(value: &Value, args: &[Value], _scope: &EvalScope<'_>) -> RuleResult<Option<Value>> {
    let text = text_of(value)?;
    for pattern in str_args(args) {
        let anchored = Regex::new(&format!("^(?:{pattern})")).map_err(|err| {
            RuleError::invalid_rule(format!("invalid regex {pattern}: {err}"))
        })?;
        if !anchored.is_match(text) {
            return Err(RuleError::invalid_data(format!("Value failed regex check: {pattern}")));
        }
    }
    Ok(None)
}

// ============================================================================
// SECTION: int
// ============================================================================

/// Parses an optionally signed decimal integer.
fn convert_int(raw: &str, _scope: &EvalScope<'_>) -> RuleResult<Value> {
    raw.trim()
        .parse::<i64>()
        .map(Value::from)
        .map_err(|_| RuleError::invalid_data("Unable to convert to int"))
}

/// Value must fall within `[lo, hi]`.
fn int_between(
    value: &Value,
    args: &[Value],
    _scope: &EvalScope<'_>,
) -> RuleResult<Option<Value>> {
    let (lo, hi) = (int_arg(args, 0)?, int_arg(args, 1)?);
    let number = integer_of(value)?;
    if number < lo || number > hi {
        return Err(RuleError::invalid_data(format!("Value is outside of bounds: {lo} to {hi}")));
    }
    Ok(None)
}

/// Value must be strictly below the argument.
fn int_less(value: &Value, args: &[Value], _scope: &EvalScope<'_>) -> RuleResult<Option<Value>> {
    let limit = int_arg(args, 0)?;
    if integer_of(value)? >= limit {
        return Err(RuleError::invalid_data(format!("Value isn't less than {limit}")));
    }
    Ok(None)
}

/// Value must be strictly above the argument.
fn int_greater(
    value: &Value,
    args: &[Value],
    _scope: &EvalScope<'_>,
) -> RuleResult<Option<Value>> {
    let limit = int_arg(args, 0)?;
    if integer_of(value)? <= limit {
        return Err(RuleError::invalid_data(format!("Value isn't greater than {limit}")));
    }
    Ok(None)
}

// ============================================================================
// SECTION: bool
// ============================================================================

/// Words accepted as true.
const TRUE_WORDS: [&str; 6] = ["yes", "y", "true", "t", "enable", "on"];
/// Words accepted as false.
const FALSE_WORDS: [&str; 6] = ["no", "n", "false", "f", "disable", "off"];

/// Parses yes/no style words, ignoring case.
fn convert_bool(raw: &str, _scope: &EvalScope<'_>) -> RuleResult<Value> {
    let word = raw.trim().to_lowercase();
    if TRUE_WORDS.contains(&word.as_str()) {
        Ok(Value::Bool(true))
    } else if FALSE_WORDS.contains(&word.as_str()) {
        Ok(Value::Bool(false))
    } else {
        Err(RuleError::invalid_data("Unable to convert into bool"))
    }
}

/// Renders `Yes` or `No`.
fn format_bool(value: &Value) -> String {
    match value {
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        other => display_value(other),
    }
}

// ============================================================================
// SECTION: url
// ============================================================================

/// Zero-width characters that `char::is_whitespace` does not cover.
const ZERO_WIDTH: [char; 6] = ['\u{180B}', '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

/// Accepts absolute `http`/`https` URLs with a dotted domain.
fn convert_url(raw: &str, _scope: &EvalScope<'_>) -> RuleResult<Value> {
    let text = raw.trim();
    if text.chars().any(|ch| ch.is_whitespace() || ZERO_WIDTH.contains(&ch)) {
        return Err(RuleError::invalid_data(
            "URL cannot have whitespace in it - is it properly encoded?",
        ));
    }
    let Some((protocol, rest)) = text.split_once("://") else {
        return Err(RuleError::invalid_data("Missing protocol (http:// or https://)"));
    };
    if protocol != "http" && protocol != "https" {
        return Err(RuleError::invalid_data("Invalid protocol (must be http or https)"));
    }
    let domain = rest.split('/').next().unwrap_or_default();
    if !domain.contains('.') {
        return Err(RuleError::invalid_data("Invalid domain"));
    }
    url::Url::parse(text).map_err(|err| RuleError::invalid_data(format!("Invalid url: {err}")))?;
    Ok(Value::String(text.to_string()))
}

// ============================================================================
// SECTION: dict
// ============================================================================

/// Key/value separator in raw dict text.
const DICT_SEPARATOR: &str = "==";

/// Parses `key==value other==value with spaces` into an ordered map.
///
/// A key is the word directly in front of `==`; everything between one key's
/// separator and the next key belongs to the earlier key's value.
fn convert_dict(raw: &str, _scope: &EvalScope<'_>) -> RuleResult<Value> {
    let mut entries = Map::new();
    let mut current = raw;
    let mut last_key: Option<String> = None;

    while let Some(index) = current.find(DICT_SEPARATOR) {
        let head = &current[.. index];
        let before_last = head.char_indices().next_back().map_or(0, |(offset, _)| offset);
        let start = head[.. before_last].rfind(' ');
        match (start, last_key.take()) {
            (Some(_), None) => {
                return Err(RuleError::invalid_data("Initial value has no key."));
            }
            (Some(start), Some(previous)) => {
                entries.insert(previous, Value::String(current[.. start].to_string()));
            }
            (None, Some(previous)) => {
                entries.insert(previous, Value::String(String::new()));
            }
            (None, None) => {}
        }
        let key_start = start.map_or(0, |start| start + 1);
        last_key = Some(current[key_start .. index].to_string());
        current = &current[index + DICT_SEPARATOR.len() ..];
    }

    let Some(last_key) = last_key else {
        return Err(RuleError::invalid_data("Value contains no separators ('==')."));
    };
    entries.insert(last_key, Value::String(current.to_string()));
    Ok(Value::Object(entries))
}

/// Renders a map back into `key==value` text.
fn format_dict(value: &Value) -> String {
    match value {
        Value::Object(entries) => entries
            .iter()
            .map(|(key, item)| format!("{key}{DICT_SEPARATOR}{}", display_value(item)))
            .collect::<Vec<_>>()
            .join(" "),
        other => display_value(other),
    }
}

/// Runs a nested rule over one dict entry, picking the mode by value type.
fn validate_entry(scope: &EvalScope<'_>, rule: &str, item: &Value) -> RuleResult<ValidationOutcome> {
    let engine = scope.engine();
    match item {
        Value::String(text) => engine.parse(RuleRef::Text(rule), text, scope.context()),
        other => engine.parse_typed(RuleRef::Text(rule), other, scope.context()),
    }
}

/// Reads the running value as a map.
fn entries_of(value: &Value) -> RuleResult<&Map<String, Value>> {
    value.as_object().ok_or_else(|| RuleError::invalid_data("Value isn't a dict"))
}

/// Every key must satisfy the nested rule; keys are replaced by the result.
fn dict_key(value: &Value, args: &[Value], scope: &EvalScope<'_>) -> RuleResult<Option<Value>> {
    let rule = str_args(args).join(",");
    let mut parsed = Map::new();
    for (key, item) in entries_of(value)? {
        match validate_entry(scope, &rule, &Value::String(key.clone()))? {
            ValidationOutcome::Valid(result) => {
                parsed.insert(display_value(&result), item.clone());
            }
            ValidationOutcome::Invalid(reasons) => {
                return Err(RuleError::invalid_data(format!(
                    "Validation failed key name {key}: {}",
                    reasons.join(", ")
                )));
            }
        }
    }
    Ok(Some(Value::Object(parsed)))
}

/// Every value must satisfy the nested rule; values are replaced by the result.
fn dict_value(value: &Value, args: &[Value], scope: &EvalScope<'_>) -> RuleResult<Option<Value>> {
    let rule = str_args(args).join(",");
    let mut parsed = Map::new();
    for (key, item) in entries_of(value)? {
        match validate_entry(scope, &rule, item)? {
            ValidationOutcome::Valid(result) => {
                parsed.insert(key.clone(), result);
            }
            ValidationOutcome::Invalid(reasons) => {
                return Err(RuleError::invalid_data(format!(
                    "Validation failed for value of {key}: {}",
                    reasons.join(", ")
                )));
            }
        }
    }
    Ok(Some(Value::Object(parsed)))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
