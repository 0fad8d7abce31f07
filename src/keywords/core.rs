//! Core vocabulary keywords
//!
//! Identifiers, anchors, references, and definition containers. `$schema`,
//! `$vocabulary`, and `$id` have their effect during dialect dispatch and
//! resource registration, before the keyword program runs; their program
//! slots only type-check (or do nothing at all).

use serde_json::Value;

use crate::context::NodeId;
use crate::error::Result;
use crate::parser::Parser;
use crate::registry::RefKind;
use crate::validator::{Evaluation, Kw};

use super::{invalid_value, string_value};

pub(crate) fn parse_noop(_: &mut Parser<'_>, _: NodeId, _: &str) -> Result<()> {
    Ok(())
}

pub(crate) fn parse_vocabulary(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    match parser.value(node, key) {
        Value::Object(entries) => {
            if let Some((uri, _)) = entries.iter().find(|(_, v)| !v.is_boolean()) {
                let uri = uri.clone();
                return Err(invalid_value(
                    parser,
                    node,
                    key,
                    format!("vocabulary {uri:?} must map to a boolean"),
                ));
            }
            Ok(())
        }
        _ => Err(invalid_value(parser, node, key, "expected object")),
    }
}

pub(crate) fn parse_comment(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    string_value(parser, node, key).map(|_| ())
}

pub(crate) fn parse_anchor(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    let name = string_value(parser, node, key)?;
    parser.bind_anchor(node, &name, false)
}

pub(crate) fn parse_dynamic_anchor(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    let name = string_value(parser, node, key)?;
    parser.bind_anchor(node, &name, true)
}

pub(crate) fn parse_ref(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    let raw = string_value(parser, node, key)?;
    parser.register_reference(node, RefKind::Static, &raw)
}

pub(crate) fn parse_dynamic_ref(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    let raw = string_value(parser, node, key)?;
    parser.register_reference(node, RefKind::Dynamic, &raw)
}

/// `$defs` / `definitions`: every member must parse as a schema; no
/// validation effect of its own.
pub(crate) fn parse_defs(parser: &mut Parser<'_>, node: NodeId, key: &str) -> Result<()> {
    let names: Vec<String> = match parser.value(node, key) {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => return Err(invalid_value(parser, node, key, "expected object")),
    };
    for name in &names {
        parser.parse_subschema(node, &[key, name])?;
    }
    Ok(())
}

pub(crate) fn validate_ref(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let target = ev
        .context()
        .registry
        .reference(kw.node, RefKind::Static)
        .and_then(|r| r.target);
    match target {
        Some(target) => {
            ev.apply(target, kw.instance, Vec::new(), None)?;
        }
        None => ev.fail("unknown schema reference"),
    }
    Ok(())
}

/// `$dynamicRef`: start from the statically resolved target; if its
/// fragment names a `$dynamicAnchor` there, the *outermost* dynamic-scope
/// resource declaring the same dynamic anchor wins.
pub(crate) fn validate_dynamic_ref(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    let ctx = ev.context();
    let reference = ctx.registry.reference(kw.node, RefKind::Dynamic).cloned();
    let Some(reference) = reference else {
        ev.fail("unknown schema reference");
        return Ok(());
    };
    let Some(mut target) = reference.target else {
        ev.fail("unknown schema reference");
        return Ok(());
    };

    if let Some(name) = &reference.anchor {
        if dynamic_anchor_of(ev, target, name).is_some() {
            for node in ev.dynamic_scope().collect::<Vec<_>>() {
                if let Some(hit) = dynamic_anchor_of(ev, node, name) {
                    target = hit;
                    break;
                }
            }
        }
    }

    ev.apply(target, kw.instance, Vec::new(), None)?;
    Ok(())
}

/// Dynamic anchor binding in the scope root enclosing `node`, if any.
fn dynamic_anchor_of(ev: &Evaluation<'_>, node: NodeId, name: &str) -> Option<NodeId> {
    let ctx = ev.context();
    let rid = ctx.registry.lookup_by_node(node)?;
    let scope = ctx.registry.resource(rid).scope;
    ctx.registry
        .resource(scope)
        .dynamic_anchors
        .get(name)
        .copied()
}
