//! Parse pipeline
//!
//! Walks a schema document top-down. For each object node: dispatch the
//! dialect declared by `$schema`, apply `$id` base-URI scoping, compute and
//! sort the keyword program, then run each keyword's parse in program order.
//! Keyword parses recurse into subschemas through the same pipeline, so
//! resources, anchors, and pending references accumulate as side effects of
//! one walk.

use serde_json::Value;
use tracing::trace;
use url::Url;

use crate::context::{Context, NodeId, NodeKind};
use crate::error::{Result, SchemaError};
use crate::keyword::{sort_program, ProgramEntry};
use crate::keywords;
use crate::registry::{RefKind, ResourceId};
use crate::value::{push_token, type_name};

const ANCHOR_NAME: &str = "^[A-Za-z_][A-Za-z0-9\\-_.]*$";

/// Lexical state threaded through the walk: the base URI for resolving
/// relative references, the dialect in force, and the enclosing scope root
/// (None only before the document root registers itself).
#[derive(Debug, Clone)]
struct ParseScope {
    base: Url,
    dialect: Url,
    scope: Option<ResourceId>,
}

pub struct Parser<'c> {
    pub(crate) ctx: &'c mut Context,
    doc: usize,
    scope: ParseScope,
}

impl<'c> Parser<'c> {
    /// Parse a whole document starting at its root.
    pub(crate) fn parse_document(ctx: &'c mut Context, doc: usize) -> Result<NodeId> {
        let base = ctx.docs[doc].base.clone();
        let dialect = ctx.default_dialect.clone();
        let mut parser = Parser {
            ctx,
            doc,
            scope: ParseScope {
                base,
                dialect,
                scope: None,
            },
        };
        parser.parse_node(String::new())
    }

    /// Parse a position reached only through a reference (it was never
    /// walked as a schema), inside an already-registered resource.
    pub(crate) fn parse_detached(
        ctx: &'c mut Context,
        doc: usize,
        pointer: String,
        base: Url,
        scope: ResourceId,
        dialect: Url,
    ) -> Result<NodeId> {
        let mut parser = Parser {
            ctx,
            doc,
            scope: ParseScope {
                base,
                dialect,
                scope: Some(scope),
            },
        };
        parser.parse_node(pointer)
    }

    fn parse_node(&mut self, pointer: String) -> Result<NodeId> {
        let (schema_decl, keys) = {
            let value = self.ctx.docs[self.doc].value.pointer(&pointer).ok_or_else(|| {
                SchemaError::SchemaNotObject {
                    location: pointer.clone(),
                }
            })?;
            match value {
                Value::Bool(b) => {
                    let b = *b;
                    return Ok(self.ctx.intern(self.doc, pointer, NodeKind::Bool(b)));
                }
                Value::Object(map) => (
                    map.get("$schema").cloned(),
                    map.keys().cloned().collect::<Vec<_>>(),
                ),
                _ => return Err(SchemaError::SchemaNotObject { location: pointer }),
            }
        };

        let node = self.ctx.intern(self.doc, pointer.clone(), NodeKind::Object);
        if self.ctx.registry.lookup_by_node(node).is_some() {
            // Reached twice (e.g. a reference target inside a walked
            // subtree); the first parse stands.
            return Ok(node);
        }
        trace!(pointer = %pointer, "parsing schema object");

        let dialect_uri = match schema_decl {
            Some(Value::String(s)) => {
                let uri = Url::parse(&s).map_err(|_| SchemaError::UnknownDialect { uri: s.clone() })?;
                match self.find_dialect_uri(uri) {
                    Some(uri) => uri,
                    None => return Err(SchemaError::UnknownDialect { uri: s }),
                }
            }
            Some(other) => {
                return Err(SchemaError::InvalidKeywordValue {
                    keyword: "$schema".to_string(),
                    location: push_token(&pointer, "$schema"),
                    reason: format!("expected string, got {}", type_name(&other)),
                })
            }
            None => self.scope.dialect.clone(),
        };
        let dialect = self
            .ctx
            .dialect(&dialect_uri)
            .ok_or_else(|| SchemaError::UnknownDialect {
                uri: dialect_uri.to_string(),
            })?;

        // $id (or legacy id) rescopes the base URI for this subtree and, if
        // absolute, becomes the canonical URI of a new scope root.
        let id_value = self
            .ctx
            .docs[self.doc]
            .value
            .pointer(&pointer)
            .and_then(Value::as_object)
            .and_then(|map| map.get(dialect.id_key))
            .cloned();
        let mut base = self.scope.base.clone();
        let mut canonical: Option<Url> = None;
        let mut anchor_from_id: Option<String> = None;
        if let Some(value) = id_value {
            let raw = match value {
                Value::String(raw) => raw,
                other => {
                    return Err(SchemaError::InvalidKeywordValue {
                        keyword: dialect.id_key.to_string(),
                        location: push_token(&pointer, dialect.id_key),
                        reason: format!("expected string, got {}", type_name(&other)),
                    })
                }
            };
            let resolved = base.join(&raw).map_err(|e| SchemaError::InvalidUri {
                uri: raw.clone(),
                reason: e.to_string(),
            })?;
            let fragment = resolved.fragment().unwrap_or("").to_string();
            if !fragment.is_empty() {
                // 2020-12 forbids fragments here; older dialects accept a
                // plain name and treat it as both id and anchor.
                if !dialect.id_fragment_as_anchor || fragment.starts_with('/') {
                    return Err(SchemaError::IdWithFragment {
                        keyword: dialect.id_key.to_string(),
                        location: push_token(&pointer, dialect.id_key),
                        uri: raw,
                    });
                }
                anchor_from_id = Some(fragment);
            }
            if !raw.starts_with('#') {
                let mut resolved = resolved;
                resolved.set_fragment(None);
                canonical = Some(resolved.clone());
                base = resolved;
            }
        }

        let parent_scope = self.scope.scope;
        let is_scope_root = canonical.is_some() || parent_scope.is_none();
        let rid = self.ctx.registry.register(
            node,
            base.clone(),
            dialect_uri.clone(),
            if is_scope_root { None } else { parent_scope },
        );
        if let Some(canonical) = canonical {
            self.ctx.registry.set_canonical(rid, canonical);
        }
        if parent_scope.is_none() {
            // The document root is always findable under the URI the
            // document entered the context with.
            let doc_base = self.ctx.docs[self.doc].base.clone();
            self.ctx.registry.index_uri(doc_base, rid);
        }
        if let Some(name) = anchor_from_id {
            self.check_anchor_name(&name, &pointer)?;
            let target = parent_scope.unwrap_or(rid);
            self.ctx.registry.set_anchor(target, &name, node, false);
        }

        let mut program: Vec<ProgramEntry> = keys
            .iter()
            .map(|key| ProgramEntry {
                key: key.clone(),
                keyword: dialect
                    .keywords
                    .get(key)
                    .copied()
                    .unwrap_or_else(keywords::unknown_keyword),
            })
            .collect();
        sort_program(&mut program)?;
        self.ctx.registry.set_program(rid, program.clone());

        let scope_root = self.ctx.registry.resource(rid).scope;
        let child = ParseScope {
            base,
            dialect: dialect_uri,
            scope: Some(scope_root),
        };
        let saved = std::mem::replace(&mut self.scope, child);
        let walk = self.run_program(node, &program);
        self.scope = saved;
        walk?;
        Ok(node)
    }

    /// Dialect table lookup, tolerating the presence or absence of the
    /// empty fragment meta-schema URIs are written with interchangeably.
    fn find_dialect_uri(&self, uri: Url) -> Option<Url> {
        if self.ctx.dialects.contains_key(&uri) {
            return Some(uri);
        }
        let mut toggled = uri;
        match toggled.fragment() {
            Some("") => toggled.set_fragment(None),
            None => toggled.set_fragment(Some("")),
            Some(_) => return None,
        }
        self.ctx.dialects.contains_key(&toggled).then_some(toggled)
    }

    fn run_program(&mut self, node: NodeId, program: &[ProgramEntry]) -> Result<()> {
        for entry in program {
            (entry.keyword.parse)(self, node, &entry.key)?;
        }
        Ok(())
    }

    /// Value of a keyword on its schema object.
    pub(crate) fn value(&self, node: NodeId, key: &str) -> &Value {
        self.ctx
            .node_value(node)
            .as_object()
            .and_then(|map| map.get(key))
            .expect("keyword key exists on its schema object")
    }

    /// Schema location of a keyword, for error messages.
    pub(crate) fn location(&self, node: NodeId, key: &str) -> String {
        push_token(&self.ctx.node(node).pointer, key)
    }

    /// Recursively parse a subschema at `segments` under `node`.
    pub(crate) fn parse_subschema(&mut self, node: NodeId, segments: &[&str]) -> Result<NodeId> {
        let mut pointer = self.ctx.node(node).pointer.clone();
        for segment in segments {
            pointer = push_token(&pointer, segment);
        }
        self.parse_node(pointer)
    }

    /// Queue a reference from `node`, resolved against the current base URI.
    pub(crate) fn register_reference(
        &mut self,
        node: NodeId,
        kind: RefKind,
        raw: &str,
    ) -> Result<()> {
        let uri = self.scope.base.join(raw).map_err(|e| SchemaError::InvalidUri {
            uri: raw.to_string(),
            reason: e.to_string(),
        })?;
        self.ctx.registry.register_reference(node, kind, uri);
        Ok(())
    }

    /// Bind an anchor name in the enclosing scope root.
    pub(crate) fn bind_anchor(&mut self, node: NodeId, name: &str, dynamic: bool) -> Result<()> {
        let location = self.ctx.node(node).pointer.clone();
        self.check_anchor_name(name, &location)?;
        let scope = self
            .scope
            .scope
            .expect("keyword parse runs inside a registered resource");
        self.ctx.registry.set_anchor(scope, name, node, dynamic);
        Ok(())
    }

    /// Compile a pattern into the context cache, failing the parse if it is
    /// not a valid regular expression.
    pub(crate) fn compile_pattern(&mut self, pattern: &str) -> Result<()> {
        self.ctx.pattern_for(pattern).map(|_| ())
    }

    fn check_anchor_name(&mut self, name: &str, location: &str) -> Result<()> {
        let regex = self.ctx.pattern_for(ANCHOR_NAME)?;
        if regex.is_match(name) {
            Ok(())
        } else {
            Err(SchemaError::InvalidAnchor {
                name: name.to_string(),
                location: location.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_non_schema_document_is_rejected() {
        let mut ctx = Context::new();
        let err = ctx.parse(json!(5)).await.unwrap_err();
        assert!(matches!(err, SchemaError::SchemaNotObject { .. }));
    }

    #[tokio::test]
    async fn test_unknown_dialect_is_rejected() {
        let mut ctx = Context::new();
        let err = ctx
            .parse(json!({"$schema": "https://example.com/unknown-dialect"}))
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownDialect { .. }));
    }

    #[tokio::test]
    async fn test_2020_12_id_rejects_fragments() {
        let mut ctx = Context::new();
        let err = ctx
            .parse(json!({"$id": "https://example.com/root#anchor"}))
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaError::IdWithFragment { .. }));
    }

    #[tokio::test]
    async fn test_draft07_id_fragment_becomes_anchor() {
        let mut ctx = Context::new();
        let schema = ctx
            .parse(json!({
                "$schema": "http://json-schema.org/draft-07/schema#",
                "definitions": {
                    "leaf": {"$id": "#leaf", "type": "string"}
                },
                "$ref": "#leaf"
            }))
            .await
            .unwrap();
        assert!(schema.is_valid(&ctx, &json!("text")).unwrap());
        assert!(!schema.is_valid(&ctx, &json!(5)).unwrap());
    }

    #[tokio::test]
    async fn test_invalid_pattern_fails_parse() {
        let mut ctx = Context::new();
        let err = ctx.parse(json!({"pattern": "a("})).await.unwrap_err();
        assert!(matches!(err, SchemaError::InvalidRegex { .. }));
    }

    #[tokio::test]
    async fn test_invalid_anchor_name_fails_parse() {
        let mut ctx = Context::new();
        let err = ctx.parse(json!({"$anchor": "0bad"})).await.unwrap_err();
        assert!(matches!(err, SchemaError::InvalidAnchor { .. }));
    }

    #[tokio::test]
    async fn test_program_is_sorted_on_the_resource() {
        let mut ctx = Context::new();
        let schema = ctx
            .parse(json!({
                "additionalProperties": false,
                "properties": {"a": true},
                "patternProperties": {"^b": true}
            }))
            .await
            .unwrap();
        let rid = ctx.registry.lookup_by_node(schema.root()).unwrap();
        let keys: Vec<&str> = ctx
            .registry
            .resource(rid)
            .program
            .iter()
            .map(|e| e.key.as_str())
            .collect();
        assert_eq!(keys, vec!["properties", "patternProperties", "additionalProperties"]);
    }

    #[tokio::test]
    async fn test_unresolved_reference_fails_parse() {
        let mut ctx = Context::new();
        let err = ctx
            .parse(json!({"$ref": "#/$defs/missing", "$defs": {}}))
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaError::Unresolved { .. }));
    }
}
