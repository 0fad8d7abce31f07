//! Resource registry
//!
//! Every object schema node owns a resource carrying its base URI, dialect,
//! and sorted keyword program. Resources with their own `$id` (and document
//! roots) are *scope roots*: anchors bind to them and absolute URIs index
//! them. References are collected during the walk and bound here afterwards,
//! fetching unknown bases through the context's loader.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use tracing::debug;
use url::Url;

use crate::context::{Context, NodeId};
use crate::error::{Result, SchemaError};
use crate::keyword::ProgramEntry;
use crate::parser::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub(crate) usize);

/// Reference kind: `$ref` or `$dynamicRef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Static,
    Dynamic,
}

#[derive(Debug)]
pub(crate) struct Resource {
    pub node: NodeId,
    pub canonical_uri: Option<Url>,
    pub base_uri: Url,
    pub dialect: Url,
    /// Nearest enclosing scope root (self for `$id` bearers and doc roots).
    pub scope: ResourceId,
    pub program: Vec<ProgramEntry>,
    pub anchors: HashMap<String, NodeId>,
    pub dynamic_anchors: HashMap<String, NodeId>,
}

/// A resolved (or still pending) reference edge.
#[derive(Debug, Clone)]
pub(crate) struct Reference {
    pub uri: Url,
    /// Plain-name fragment, kept for dynamic-scope lookup.
    pub anchor: Option<String>,
    pub target: Option<NodeId>,
}

#[derive(Debug)]
struct PendingReference {
    node: NodeId,
    kind: RefKind,
    uri: Url,
}

#[derive(Debug, Default)]
pub(crate) struct ResourceRegistry {
    resources: Vec<Resource>,
    by_uri: HashMap<Url, ResourceId>,
    by_node: HashMap<NodeId, ResourceId>,
    references: HashMap<(NodeId, RefKind), Reference>,
    pending: Vec<PendingReference>,
}

impl ResourceRegistry {
    /// Attach a resource to a node. With `scope = None` the resource is its
    /// own scope root.
    pub fn register(
        &mut self,
        node: NodeId,
        base_uri: Url,
        dialect: Url,
        scope: Option<ResourceId>,
    ) -> ResourceId {
        let id = ResourceId(self.resources.len());
        self.resources.push(Resource {
            node,
            canonical_uri: None,
            base_uri,
            dialect,
            scope: scope.unwrap_or(id),
            program: Vec::new(),
            anchors: HashMap::new(),
            dynamic_anchors: HashMap::new(),
        });
        self.by_node.insert(node, id);
        id
    }

    /// Record the canonical URI of a resource and index it globally.
    pub fn set_canonical(&mut self, id: ResourceId, uri: Url) {
        self.resources[id.0].canonical_uri = Some(uri.clone());
        self.by_uri.insert(uri, id);
    }

    /// Index a resource under an extra absolute URI (e.g. the URI a document
    /// was fetched from, which may differ from its declared `$id`).
    pub fn index_uri(&mut self, uri: Url, id: ResourceId) {
        self.by_uri.entry(uri).or_insert(id);
    }

    pub fn lookup_by_uri(&self, uri: &Url) -> Option<ResourceId> {
        self.by_uri.get(uri).copied()
    }

    pub fn lookup_by_node(&self, node: NodeId) -> Option<ResourceId> {
        self.by_node.get(&node).copied()
    }

    pub fn resource(&self, id: ResourceId) -> &Resource {
        &self.resources[id.0]
    }

    pub fn set_program(&mut self, id: ResourceId, program: Vec<ProgramEntry>) {
        self.resources[id.0].program = program;
    }

    /// Bind a plain-name fragment within a resource. Dynamic anchors also
    /// join the dynamic-scope lookup table.
    pub fn set_anchor(&mut self, id: ResourceId, name: &str, node: NodeId, dynamic: bool) {
        let resource = &mut self.resources[id.0];
        resource.anchors.insert(name.to_string(), node);
        if dynamic {
            resource.dynamic_anchors.insert(name.to_string(), node);
        }
    }

    /// Queue a reference for the post-parse resolution pass.
    pub fn register_reference(&mut self, node: NodeId, kind: RefKind, uri: Url) {
        self.pending.push(PendingReference { node, kind, uri });
    }

    pub fn reference(&self, node: NodeId, kind: RefKind) -> Option<&Reference> {
        self.references.get(&(node, kind))
    }
}

/// Bind every pending reference. Fetched documents are parsed as they
/// arrive, and any references they queue are drained in the same pass.
pub(crate) async fn resolve_pending(ctx: &mut Context) -> Result<()> {
    loop {
        let pending = std::mem::take(&mut ctx.registry.pending);
        if pending.is_empty() {
            return Ok(());
        }
        for reference in pending {
            resolve_one(ctx, reference).await?;
        }
    }
}

async fn resolve_one(ctx: &mut Context, pending: PendingReference) -> Result<()> {
    let mut base = pending.uri.clone();
    base.set_fragment(None);
    let fragment = match pending.uri.fragment() {
        None | Some("") => None,
        Some(f) => Some(
            percent_decode_str(f)
                .decode_utf8()
                .map_err(|e| SchemaError::InvalidUri {
                    uri: pending.uri.to_string(),
                    reason: e.to_string(),
                })?
                .into_owned(),
        ),
    };

    let rid = match ctx.registry.lookup_by_uri(&base) {
        Some(rid) => rid,
        None => fetch_resource(ctx, &base).await?,
    };

    let mut anchor = None;
    let target = match fragment.as_deref() {
        None => ctx.registry.resource(rid).node,
        Some(pointer) if pointer.starts_with('/') => {
            resolve_pointer(ctx, rid, pointer, &pending.uri)?
        }
        Some(name) => {
            anchor = Some(name.to_string());
            ctx.registry
                .resource(rid)
                .anchors
                .get(name)
                .copied()
                .ok_or_else(|| SchemaError::Unresolved {
                    uri: pending.uri.to_string(),
                })?
        }
    };

    debug!(uri = %pending.uri, kind = ?pending.kind, "resolved reference");
    ctx.registry.references.insert(
        (pending.node, pending.kind),
        Reference {
            uri: pending.uri,
            anchor,
            target: Some(target),
        },
    );
    Ok(())
}

/// Descend a JSON pointer fragment from a resource's node. A position that
/// exists in the document but was never walked as a schema (for example
/// under an unknown keyword) is parsed on demand with this resource's
/// dialect.
fn resolve_pointer(ctx: &mut Context, rid: ResourceId, pointer: &str, uri: &Url) -> Result<NodeId> {
    let resource = ctx.registry.resource(rid);
    let (doc, node_pointer) = {
        let data = ctx.node(resource.node);
        (data.doc, data.pointer.clone())
    };
    let absolute = format!("{node_pointer}{pointer}");
    if let Some(target) = ctx.node_at(doc, &absolute) {
        return Ok(target);
    }
    if ctx.docs[doc].value.pointer(&absolute).is_none() {
        return Err(SchemaError::Unresolved {
            uri: uri.to_string(),
        });
    }
    debug!(uri = %uri, "parsing reference target on demand");
    let base = ctx.registry.resource(rid).base_uri.clone();
    let dialect = ctx.registry.resource(rid).dialect.clone();
    Parser::parse_detached(ctx, doc, absolute, base, rid, dialect)
}

async fn fetch_resource(ctx: &mut Context, base: &Url) -> Result<ResourceId> {
    debug!(uri = %base, "fetching external resource");
    let loader = ctx.loader.clone();
    let document = loader.load(base).await?;
    ctx.add_document(document, base.clone())?;
    ctx.registry
        .lookup_by_uri(base)
        .ok_or_else(|| SchemaError::Unresolved {
            uri: base.to_string(),
        })
}
