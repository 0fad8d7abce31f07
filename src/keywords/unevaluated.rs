//! Unevaluated vocabulary keywords
//!
//! `unevaluatedItems` and `unevaluatedProperties` run after every applicator
//! (the `@unevaluated` barrier guarantees it) and look at the *aggregated*
//! annotations for the current instance location across the whole dynamic
//! scope: whatever `properties`, `items`, `contains`, references, and
//! earlier `unevaluated` keywords covered — wherever they validated
//! successfully — is off limits; everything else gets the subschema.

use std::collections::HashSet;

use serde_json::{json, Value};

use crate::error::Result;
use crate::validator::{Evaluation, Kw};

pub(crate) fn validate_unevaluated_items(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let Value::Array(items) = kw.instance else {
        return Ok(());
    };

    // First uncovered index: past everything claimed positionally.
    let mut bound = 0usize;
    for annotation in ev.dynamic_annotations(&["prefixItems", "items", "unevaluatedItems"]) {
        match annotation {
            Value::Bool(true) => bound = items.len(),
            value => {
                if let Some(n) = value.as_u64() {
                    bound = bound.max(n as usize + 1);
                }
            }
        }
    }

    // Indices claimed individually by `contains`.
    let mut contained: HashSet<usize> = HashSet::new();
    for annotation in ev.dynamic_annotations(&["contains"]) {
        match annotation {
            Value::Bool(true) => bound = items.len(),
            Value::Array(indices) => {
                contained.extend(indices.iter().filter_map(|i| i.as_u64().map(|i| i as usize)));
            }
            _ => {}
        }
    }

    let sub = ev.subschema(kw.node, &[kw.key])?;
    let mut applied = false;
    for (i, item) in items.iter().enumerate().skip(bound) {
        if contained.contains(&i) {
            continue;
        }
        ev.apply(sub, item, Vec::new(), Some(i.to_string()))?;
        applied = true;
    }
    if applied {
        ev.annotate(Value::Bool(true));
    }
    Ok(())
}

pub(crate) fn validate_unevaluated_properties(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let Value::Object(members) = kw.instance else {
        return Ok(());
    };

    let mut covered: HashSet<String> = HashSet::new();
    let mut all_covered = false;
    for annotation in ev.dynamic_annotations(&[
        "properties",
        "patternProperties",
        "additionalProperties",
        "unevaluatedProperties",
    ]) {
        match annotation {
            Value::Array(names) => {
                covered.extend(names.into_iter().filter_map(|n| n.as_str().map(String::from)));
            }
            Value::Bool(true) => all_covered = true,
            _ => {}
        }
    }

    let sub = ev.subschema(kw.node, &[kw.key])?;
    let mut validated: Vec<String> = Vec::new();
    if !all_covered {
        for (name, item) in members {
            if covered.contains(name) {
                continue;
            }
            ev.apply(sub, item, Vec::new(), Some(name.clone()))?;
            validated.push(name.clone());
        }
    }
    ev.annotate(json!(validated));
    Ok(())
}
