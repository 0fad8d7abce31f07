//! Applicator vocabulary keywords
//!
//! Keywords that apply subschemas to the instance, either in place (`allOf`,
//! `not`, conditionals) or to children (`properties`, `items`, ...). Child
//! applicators leave annotations naming what they covered; those drive
//! `additionalProperties` within a schema object and the `unevaluated`
//! keywords across the dynamic scope.

use serde_json::{json, Value};

use crate::context::NodeId;
use crate::error::Result;
use crate::parser::Parser;
use crate::validator::{Evaluation, Kw};

use super::invalid_value;

// ---------------------------------------------------------------------------
// parse

/// Non-empty array of schemas (`allOf`, `anyOf`, `oneOf`, `prefixItems`).
pub(crate) fn parse_schema_array(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    let len = match parser.value(node, key) {
        Value::Array(items) if items.is_empty() => {
            return Err(invalid_value(parser, node, key, "must not be empty"))
        }
        Value::Array(items) => items.len(),
        _ => return Err(invalid_value(parser, node, key, "expected array of schemas")),
    };
    for i in 0..len {
        parser.parse_subschema(node, &[key, &i.to_string()])?;
    }
    Ok(())
}

/// A single subschema value (`not`, `if`, `items`, `contains`, ...).
pub(crate) fn parse_schema(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    parser.parse_subschema(node, &[key])?;
    Ok(())
}

/// Object of subschemas (`properties`, `dependentSchemas`).
pub(crate) fn parse_schema_map(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    let names: Vec<String> = match parser.value(node, key) {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => return Err(invalid_value(parser, node, key, "expected object of schemas")),
    };
    for name in &names {
        parser.parse_subschema(node, &[key, name])?;
    }
    Ok(())
}

/// `patternProperties`: like a schema map, but every key must also compile
/// as a regex. An uncompilable pattern fails the parse.
pub(crate) fn parse_pattern_properties(
    parser: &mut Parser<'_>,
    node: NodeId,
    key: &str,
) -> Result<()> {
    let patterns: Vec<String> = match parser.value(node, key) {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => return Err(invalid_value(parser, node, key, "expected object of schemas")),
    };
    for pattern in &patterns {
        parser.compile_pattern(pattern)?;
        parser.parse_subschema(node, &[key, pattern])?;
    }
    Ok(())
}

/// Draft-07 `items`: a schema, or an array of schemas applied positionally.
pub(crate) fn parse_items_draft7(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    match parser.value(node, key) {
        Value::Array(_) => parse_schema_array(parser, node, key),
        _ => parse_schema(parser, node, key),
    }
}

/// Draft-07 `dependencies`: array members are required-property lists,
/// everything else is a subschema.
pub(crate) fn parse_dependencies(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    let members: Vec<(String, bool)> = match parser.value(node, key) {
        Value::Object(map) => map
            .iter()
            .map(|(name, v)| (name.clone(), v.is_array()))
            .collect(),
        _ => return Err(invalid_value(parser, node, key, "expected object")),
    };
    for (name, is_array) in &members {
        if *is_array {
            let all_strings = match parser.value(node, key) {
                Value::Object(map) => map
                    .get(name)
                    .and_then(Value::as_array)
                    .map(|names| names.iter().all(Value::is_string))
                    .unwrap_or(false),
                _ => false,
            };
            if !all_strings {
                let reason = format!("entry {name:?}: expected array of property names");
                return Err(invalid_value(parser, node, key, reason));
            }
        } else {
            parser.parse_subschema(node, &[key, name])?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// validate

pub(crate) fn validate_all_of(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let Value::Array(subschemas) = kw.value else {
        return Ok(());
    };
    let mut failed = 0usize;
    for i in 0..subschemas.len() {
        let sub = ev.subschema(kw.node, &[kw.key, &i.to_string()])?;
        if !ev.apply(sub, kw.instance, vec![i.to_string()], None)? {
            failed += 1;
        }
    }
    if failed > 0 {
        ev.fail(format!("{failed} of {} subschemas failed", subschemas.len()));
    }
    Ok(())
}

pub(crate) fn validate_any_of(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let Value::Array(subschemas) = kw.value else {
        return Ok(());
    };
    // Every branch runs so annotations of every passing branch survive; the
    // failures are rolled back if anything matched.
    let checkpoint = ev.checkpoint();
    let mut matched = false;
    for i in 0..subschemas.len() {
        let sub = ev.subschema(kw.node, &[kw.key, &i.to_string()])?;
        if ev.apply(sub, kw.instance, vec![i.to_string()], None)? {
            matched = true;
        }
    }
    if matched {
        ev.restore(checkpoint);
    } else {
        ev.fail("does not match any subschema");
    }
    Ok(())
}

pub(crate) fn validate_one_of(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let Value::Array(subschemas) = kw.value else {
        return Ok(());
    };
    let checkpoint = ev.checkpoint();
    let mut matched = 0usize;
    for i in 0..subschemas.len() {
        let sub = ev.subschema(kw.node, &[kw.key, &i.to_string()])?;
        if ev.apply(sub, kw.instance, vec![i.to_string()], None)? {
            matched += 1;
        }
    }
    match matched {
        1 => ev.restore(checkpoint),
        0 => ev.fail("does not match exactly one subschema (0 matched)"),
        n => {
            ev.restore(checkpoint);
            ev.fail(format!("does not match exactly one subschema ({n} matched)"));
        }
    }
    Ok(())
}

pub(crate) fn validate_not(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let sub = ev.subschema(kw.node, &[kw.key])?;
    let checkpoint = ev.checkpoint();
    if ev.apply(sub, kw.instance, Vec::new(), None)? {
        ev.fail("instance must not match the subschema");
    } else {
        ev.restore(checkpoint);
    }
    Ok(())
}

/// `if` never affects validity; it annotates its outcome for `then`/`else`.
pub(crate) fn validate_if(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let sub = ev.subschema(kw.node, &[kw.key])?;
    let checkpoint = ev.checkpoint();
    let matched = ev.apply(sub, kw.instance, Vec::new(), None)?;
    if !matched {
        ev.restore(checkpoint);
    }
    ev.annotate(Value::Bool(matched));
    Ok(())
}

pub(crate) fn validate_then(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    if ev.sibling_annotation("if") == Some(Value::Bool(true)) {
        let sub = ev.subschema(kw.node, &[kw.key])?;
        ev.apply(sub, kw.instance, Vec::new(), None)?;
    }
    Ok(())
}

pub(crate) fn validate_else(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    if ev.sibling_annotation("if") == Some(Value::Bool(false)) {
        let sub = ev.subschema(kw.node, &[kw.key])?;
        ev.apply(sub, kw.instance, Vec::new(), None)?;
    }
    Ok(())
}

pub(crate) fn validate_dependent_schemas(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Value::Object(dependencies), Value::Object(members)) = (kw.value, kw.instance) else {
        return Ok(());
    };
    for name in dependencies.keys() {
        if members.contains_key(name) {
            let sub = ev.subschema(kw.node, &[kw.key, name])?;
            ev.apply(sub, kw.instance, vec![name.clone()], None)?;
        }
    }
    Ok(())
}

/// Draft-07 `dependencies`: required-list entries check presence, schema
/// entries apply in place.
pub(crate) fn validate_dependencies(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Value::Object(dependencies), Value::Object(members)) = (kw.value, kw.instance) else {
        return Ok(());
    };
    for (name, requirement) in dependencies {
        if !members.contains_key(name) {
            continue;
        }
        match requirement {
            Value::Array(required) => {
                for needed in required.iter().filter_map(Value::as_str) {
                    if !members.contains_key(needed) {
                        ev.fail(format!("property {name:?} requires property {needed:?}"));
                    }
                }
            }
            _ => {
                let sub = ev.subschema(kw.node, &[kw.key, name])?;
                ev.apply(sub, kw.instance, vec![name.clone()], None)?;
            }
        }
    }
    Ok(())
}

/// Positional application shared by `prefixItems` and array-form `items`.
/// Annotation: the largest validated index, or `true` when every instance
/// item was covered.
fn validate_positional(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Value::Array(subschemas), Value::Array(items)) = (kw.value, kw.instance) else {
        return Ok(());
    };
    let applied = items.len().min(subschemas.len());
    for (i, item) in items.iter().enumerate().take(applied) {
        let sub = ev.subschema(kw.node, &[kw.key, &i.to_string()])?;
        ev.apply(sub, item, vec![i.to_string()], Some(i.to_string()))?;
    }
    if items.len() <= subschemas.len() {
        ev.annotate(Value::Bool(true));
    } else if applied > 0 {
        ev.annotate(json!(applied - 1));
    }
    Ok(())
}

pub(crate) fn validate_prefix_items(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    validate_positional(ev, kw)
}

/// 2020-12 `items`: applies past the prefix covered by `prefixItems`.
pub(crate) fn validate_items(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let Value::Array(items) = kw.instance else {
        return Ok(());
    };
    let start = match ev.sibling_annotation("prefixItems") {
        Some(Value::Bool(true)) => items.len(),
        Some(value) => value.as_u64().map(|n| n as usize + 1).unwrap_or(0),
        None => 0,
    };
    apply_to_tail(ev, kw, start)
}

/// Draft-07 `items`: positional when the value is an array, otherwise
/// applied to every item.
pub(crate) fn validate_items_draft7(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    match kw.value {
        Value::Array(_) => validate_positional(ev, kw),
        _ => apply_to_tail(ev, kw, 0),
    }
}

/// Draft-07 `additionalItems`: applies past an array-form `items`; a no-op
/// otherwise.
pub(crate) fn validate_additional_items(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let start = match ev.sibling_value(kw.node, "items") {
        Some(Value::Array(subschemas)) => subschemas.len(),
        _ => return Ok(()),
    };
    apply_to_tail(ev, kw, start)
}

fn apply_to_tail(ev: &mut Evaluation<'_>, kw: Kw<'_>, start: usize) -> Result<()> {
    let Value::Array(items) = kw.instance else {
        return Ok(());
    };
    let sub = ev.subschema(kw.node, &[kw.key])?;
    let mut applied = false;
    for (i, item) in items.iter().enumerate().skip(start) {
        ev.apply(sub, item, Vec::new(), Some(i.to_string()))?;
        applied = true;
    }
    if applied {
        ev.annotate(Value::Bool(true));
    }
    Ok(())
}

/// `contains`: speculative per item; valid iff something matched, unless the
/// adjacent `minContains` is 0. Annotation: matching indices, or `true` when
/// every item matched.
pub(crate) fn validate_contains(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let Value::Array(items) = kw.instance else {
        return Ok(());
    };
    let sub = ev.subschema(kw.node, &[kw.key])?;
    let mut matched = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let checkpoint = ev.checkpoint();
        if ev.apply(sub, item, Vec::new(), Some(i.to_string()))? {
            matched.push(i);
        } else {
            ev.restore(checkpoint);
        }
    }
    let min_contains = ev
        .sibling_value(kw.node, "minContains")
        .and_then(Value::as_u64)
        .unwrap_or(1);
    if matched.is_empty() && min_contains > 0 {
        ev.fail("no array items match the contains schema");
    }
    if matched.len() == items.len() {
        ev.annotate(Value::Bool(true));
    } else {
        ev.annotate(json!(matched));
    }
    Ok(())
}

/// `properties`: annotation lists the property names validated.
pub(crate) fn validate_properties(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Value::Object(subschemas), Value::Object(members)) = (kw.value, kw.instance) else {
        return Ok(());
    };
    let mut matched: Vec<String> = Vec::new();
    for name in subschemas.keys() {
        if let Some(item) = members.get(name) {
            let sub = ev.subschema(kw.node, &[kw.key, name])?;
            ev.apply(sub, item, vec![name.clone()], Some(name.clone()))?;
            matched.push(name.clone());
        }
    }
    ev.annotate(json!(matched));
    Ok(())
}

pub(crate) fn validate_pattern_properties(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let (Value::Object(subschemas), Value::Object(members)) = (kw.value, kw.instance) else {
        return Ok(());
    };
    let mut matched: Vec<String> = Vec::new();
    for pattern in subschemas.keys() {
        let regex = ev.pattern(pattern)?;
        let sub = ev.subschema(kw.node, &[kw.key, pattern])?;
        for (name, item) in members {
            if regex.is_match(name) {
                ev.apply(sub, item, vec![pattern.clone()], Some(name.clone()))?;
                if !matched.iter().any(|m| m == name) {
                    matched.push(name.clone());
                }
            }
        }
    }
    ev.annotate(json!(matched));
    Ok(())
}

/// `additionalProperties`: applies to every member not already claimed by
/// the sibling `properties`/`patternProperties` annotations.
pub(crate) fn validate_additional_properties(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let Value::Object(members) = kw.instance else {
        return Ok(());
    };
    let mut covered: Vec<String> = Vec::new();
    for annotation in ev.sibling_annotations(&["properties", "patternProperties"]) {
        if let Value::Array(names) = annotation {
            covered.extend(names.into_iter().filter_map(|n| n.as_str().map(String::from)));
        }
    }
    let sub = ev.subschema(kw.node, &[kw.key])?;
    let mut validated: Vec<String> = Vec::new();
    for (name, item) in members {
        if covered.iter().any(|c| c == name) {
            continue;
        }
        ev.apply(sub, item, Vec::new(), Some(name.clone()))?;
        validated.push(name.clone());
    }
    ev.annotate(json!(validated));
    Ok(())
}

/// `propertyNames`: every member *name* validates as a string instance.
/// Results are reported at the owning object's location.
pub(crate) fn validate_property_names(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let Value::Object(members) = kw.instance else {
        return Ok(());
    };
    let sub = ev.subschema(kw.node, &[kw.key])?;
    for name in members.keys() {
        let name_instance = Value::String(name.clone());
        ev.apply(sub, &name_instance, Vec::new(), None)?;
    }
    Ok(())
}
