//! Validation vocabulary keywords
//!
//! Plain assertions over one instance value. Each keyword is a no-op when
//! the instance type is outside its domain: `maxLength` on a number says
//! nothing, `required` on an array says nothing.

use serde_json::Value;

use crate::context::{NodeId, ValidationMode};
use crate::error::Result;
use crate::format;
use crate::parser::Parser;
use crate::validator::{Evaluation, Kw};
use crate::value::{as_number, equal, matches_type, type_name, unicode_length};

use super::{invalid_value, string_value};

const TYPE_NAMES: &[&str] = &[
    "null", "boolean", "number", "integer", "string", "array", "object",
];

// ---------------------------------------------------------------------------
// parse

pub(crate) fn parse_type(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    let check = |name: &Value| -> Option<String> {
        match name {
            Value::String(s) if TYPE_NAMES.contains(&s.as_str()) => None,
            other => Some(format!("unknown type name {other}")),
        }
    };
    match parser.value(node, key) {
        Value::String(_) | Value::Array(_) => {}
        other => {
            let reason = format!("expected string or array, got {}", type_name(other));
            return Err(invalid_value(parser, node, key, reason));
        }
    }
    let complaint = match parser.value(node, key) {
        Value::String(_) => check(parser.value(node, key)),
        Value::Array(names) => names.iter().find_map(check),
        _ => None,
    };
    match complaint {
        Some(reason) => Err(invalid_value(parser, node, key, reason)),
        None => Ok(()),
    }
}

pub(crate) fn parse_enum(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    match parser.value(node, key) {
        Value::Array(_) => Ok(()),
        other => {
            let reason = format!("expected array, got {}", type_name(other));
            Err(invalid_value(parser, node, key, reason))
        }
    }
}

pub(crate) fn parse_positive_number(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    match parser.value(node, key).as_f64() {
        Some(n) if n > 0.0 => Ok(()),
        Some(_) => Err(invalid_value(parser, node, key, "must be positive")),
        None => Err(invalid_value(parser, node, key, "expected number")),
    }
}

pub(crate) fn parse_number(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    match parser.value(node, key).as_f64() {
        Some(_) => Ok(()),
        None => Err(invalid_value(parser, node, key, "expected number")),
    }
}

pub(crate) fn parse_boolean(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    match parser.value(node, key) {
        Value::Bool(_) => Ok(()),
        other => {
            let reason = format!("expected boolean, got {}", type_name(other));
            Err(invalid_value(parser, node, key, reason))
        }
    }
}

pub(crate) fn parse_count(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    match parser.value(node, key).as_u64() {
        Some(_) => Ok(()),
        None => Err(invalid_value(parser, node, key, "expected a non-negative integer")),
    }
}

pub(crate) fn parse_pattern(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    let pattern = string_value(parser, node, key)?;
    parser.compile_pattern(&pattern)
}

fn unique_strings(names: &[Value]) -> std::result::Result<(), String> {
    for (i, name) in names.iter().enumerate() {
        let Value::String(name) = name else {
            return Err(format!("expected array of strings, found {}", type_name(name)));
        };
        if names[..i].iter().any(|other| other.as_str() == Some(name)) {
            return Err(format!("duplicate entry {name:?}"));
        }
    }
    Ok(())
}

pub(crate) fn parse_required(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    match parser.value(node, key) {
        Value::Array(names) => match unique_strings(names) {
            Ok(()) => Ok(()),
            Err(reason) => Err(invalid_value(parser, node, key, reason)),
        },
        other => {
            let reason = format!("expected array, got {}", type_name(other));
            Err(invalid_value(parser, node, key, reason))
        }
    }
}

pub(crate) fn parse_dependent_required(
    parser: &mut Parser<'_>,
    node: NodeId,
    key: &str,
) -> Result<()> {
    match parser.value(node, key) {
        Value::Object(map) => {
            let complaint = map.iter().find_map(|(name, requirement)| match requirement {
                Value::Array(names) => unique_strings(names)
                    .err()
                    .map(|reason| format!("entry {name:?}: {reason}")),
                other => Some(format!(
                    "entry {name:?}: expected array, got {}",
                    type_name(other)
                )),
            });
            match complaint {
                Some(reason) => Err(invalid_value(parser, node, key, reason)),
                None => Ok(()),
            }
        }
        other => {
            let reason = format!("expected object, got {}", type_name(other));
            Err(invalid_value(parser, node, key, reason))
        }
    }
}

pub(crate) fn parse_format(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    string_value(parser, node, key).map(|_| ())
}

// ---------------------------------------------------------------------------
// validate

pub(crate) fn validate_type(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let names: Vec<&str> = match kw.value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => return Ok(()),
    };
    if !names.iter().any(|name| matches_type(kw.instance, name)) {
        ev.fail(format!(
            "expected {}, got {}",
            names.join(" or "),
            type_name(kw.instance)
        ));
    }
    Ok(())
}

pub(crate) fn validate_enum(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let Value::Array(candidates) = kw.value else {
        return Ok(());
    };
    if !candidates.iter().any(|c| equal(c, kw.instance)) {
        ev.fail("not one of the enumerated values");
    }
    Ok(())
}

pub(crate) fn validate_const(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    if !equal(kw.value, kw.instance) {
        ev.fail(format!("expected constant value {}", kw.value));
    }
    Ok(())
}

pub(crate) fn validate_multiple_of(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Some(divisor), Some(x)) = (as_number(kw.value), as_number(kw.instance)) else {
        return Ok(());
    };
    if (x / divisor).fract() != 0.0 {
        ev.fail(format!("{x} is not a multiple of {divisor}"));
    }
    Ok(())
}

pub(crate) fn validate_maximum(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Some(limit), Some(x)) = (as_number(kw.value), as_number(kw.instance)) else {
        return Ok(());
    };
    if x > limit {
        ev.fail(format!("{x} is greater than the maximum {limit}"));
    }
    Ok(())
}

pub(crate) fn validate_exclusive_maximum(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Some(limit), Some(x)) = (as_number(kw.value), as_number(kw.instance)) else {
        return Ok(());
    };
    if x >= limit {
        ev.fail(format!("{x} is not less than the exclusive maximum {limit}"));
    }
    Ok(())
}

pub(crate) fn validate_minimum(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Some(limit), Some(x)) = (as_number(kw.value), as_number(kw.instance)) else {
        return Ok(());
    };
    if x < limit {
        ev.fail(format!("{x} is less than the minimum {limit}"));
    }
    Ok(())
}

pub(crate) fn validate_exclusive_minimum(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Some(limit), Some(x)) = (as_number(kw.value), as_number(kw.instance)) else {
        return Ok(());
    };
    if x <= limit {
        ev.fail(format!("{x} is not greater than the exclusive minimum {limit}"));
    }
    Ok(())
}

/// Draft-04 `maximum`: exclusivity comes from a boolean sibling.
pub(crate) fn validate_maximum_draft4(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Some(limit), Some(x)) = (as_number(kw.value), as_number(kw.instance)) else {
        return Ok(());
    };
    let exclusive = matches!(
        ev.sibling_value(kw.node, "exclusiveMaximum"),
        Some(Value::Bool(true))
    );
    if (exclusive && x >= limit) || (!exclusive && x > limit) {
        ev.fail(format!("{x} exceeds the maximum {limit}"));
    }
    Ok(())
}

/// Draft-04 `minimum`: exclusivity comes from a boolean sibling.
pub(crate) fn validate_minimum_draft4(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Some(limit), Some(x)) = (as_number(kw.value), as_number(kw.instance)) else {
        return Ok(());
    };
    let exclusive = matches!(
        ev.sibling_value(kw.node, "exclusiveMinimum"),
        Some(Value::Bool(true))
    );
    if (exclusive && x <= limit) || (!exclusive && x < limit) {
        ev.fail(format!("{x} is below the minimum {limit}"));
    }
    Ok(())
}

pub(crate) fn validate_max_length(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Some(limit), Some(s)) = (kw.value.as_u64(), kw.instance.as_str()) else {
        return Ok(());
    };
    let length = unicode_length(s) as u64;
    if length > limit {
        ev.fail(format!("length {length} is greater than maxLength {limit}"));
    }
    Ok(())
}

pub(crate) fn validate_min_length(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Some(limit), Some(s)) = (kw.value.as_u64(), kw.instance.as_str()) else {
        return Ok(());
    };
    let length = unicode_length(s) as u64;
    if length < limit {
        ev.fail(format!("length {length} is less than minLength {limit}"));
    }
    Ok(())
}

pub(crate) fn validate_pattern(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Value::String(pattern), Some(s)) = (kw.value, kw.instance.as_str()) else {
        return Ok(());
    };
    let regex = ev.pattern(pattern)?;
    if !regex.is_match(s) {
        ev.fail(format!("does not match pattern {pattern:?}"));
    }
    Ok(())
}

pub(crate) fn validate_max_items(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Some(limit), Value::Array(items)) = (kw.value.as_u64(), kw.instance) else {
        return Ok(());
    };
    if items.len() as u64 > limit {
        ev.fail(format!("{} items is more than maxItems {limit}", items.len()));
    }
    Ok(())
}

pub(crate) fn validate_min_items(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Some(limit), Value::Array(items)) = (kw.value.as_u64(), kw.instance) else {
        return Ok(());
    };
    if (items.len() as u64) < limit {
        ev.fail(format!("{} items is fewer than minItems {limit}", items.len()));
    }
    Ok(())
}

pub(crate) fn validate_unique_items(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Value::Bool(true), Value::Array(items)) = (kw.value, kw.instance) else {
        return Ok(());
    };
    for (i, item) in items.iter().enumerate() {
        if items[..i].iter().any(|other| equal(other, item)) {
            ev.fail(format!("items at more than one index are equal to {item}"));
            return Ok(());
        }
    }
    Ok(())
}

pub(crate) fn validate_max_properties(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Some(limit), Value::Object(members)) = (kw.value.as_u64(), kw.instance) else {
        return Ok(());
    };
    if members.len() as u64 > limit {
        ev.fail(format!(
            "{} properties is more than maxProperties {limit}",
            members.len()
        ));
    }
    Ok(())
}

pub(crate) fn validate_min_properties(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Some(limit), Value::Object(members)) = (kw.value.as_u64(), kw.instance) else {
        return Ok(());
    };
    if (members.len() as u64) < limit {
        ev.fail(format!(
            "{} properties is fewer than minProperties {limit}",
            members.len()
        ));
    }
    Ok(())
}

pub(crate) fn validate_required(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Value::Array(names), Value::Object(members)) = (kw.value, kw.instance) else {
        return Ok(());
    };
    let missing: Vec<&str> = names
        .iter()
        .filter_map(Value::as_str)
        .filter(|name| !members.contains_key(*name))
        .collect();
    if !missing.is_empty() {
        ev.fail(format!("missing required properties: {}", missing.join(", ")));
    }
    Ok(())
}

pub(crate) fn validate_dependent_required(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Value::Object(dependencies), Value::Object(members)) = (kw.value, kw.instance) else {
        return Ok(());
    };
    for (name, requirement) in dependencies {
        if !members.contains_key(name) {
            continue;
        }
        let Value::Array(required) = requirement else {
            continue;
        };
        for needed in required.iter().filter_map(Value::as_str) {
            if !members.contains_key(needed) {
                ev.fail(format!("property {name:?} requires property {needed:?}"));
            }
        }
    }
    Ok(())
}

/// `maxContains`: bounded by the adjacent `contains` match count; a no-op
/// when `contains` produced no annotation.
pub(crate) fn validate_max_contains(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Some(limit), Value::Array(items)) = (kw.value.as_u64(), kw.instance) else {
        return Ok(());
    };
    let Some(count) = contains_count(ev, items.len()) else {
        return Ok(());
    };
    if count as u64 > limit {
        ev.fail(format!("{count} matching items is more than maxContains {limit}"));
    }
    Ok(())
}

pub(crate) fn validate_min_contains(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Some(limit), Value::Array(items)) = (kw.value.as_u64(), kw.instance) else {
        return Ok(());
    };
    let Some(count) = contains_count(ev, items.len()) else {
        return Ok(());
    };
    if (count as u64) < limit {
        ev.fail(format!("{count} matching items is fewer than minContains {limit}"));
    }
    Ok(())
}

fn contains_count(ev: &Evaluation<'_>, length: usize) -> Option<usize> {
    match ev.sibling_annotation("contains")? {
        Value::Bool(true) => Some(length),
        Value::Array(indices) => Some(indices.len()),
        _ => None,
    }
}

/// `format`: always annotates; asserts depending on dialect mode and the
/// context validation mode.
pub(crate) fn validate_format(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let Value::String(name) = kw.value else {
        return Ok(());
    };
    ev.annotate(Value::String(name.clone()));

    let dialect = ev.current_dialect()?;
    let mode = ev.context().validation_mode();
    let assertion = dialect.format_assertion;
    if !assertion && mode == ValidationMode::Off {
        return Ok(());
    }

    let verdict = match format::compose(&ev.context().formats, &dialect.formats, name) {
        Some(f) => format::check_instance(f, kw.instance).err(),
        None if assertion || mode == ValidationMode::Strict => {
            Some("unknown format name".to_string())
        }
        None => None,
    };
    if let Some(message) = verdict {
        ev.fail(format!("format {name:?}: {message}"));
    }
    Ok(())
}
