//! Shared parse/validate context
//!
//! A `Context` owns everything that outlives a single schema: the parsed
//! documents, the node arena giving schema positions their identity, the
//! resource registry, the dialect and format registries, and the regex
//! cache. Parse mutates the context; validation only reads it, so multiple
//! validations may run against a fully parsed context concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::dialect::{self, Dialect};
use crate::error::{Result, SchemaError};
use crate::format::Format;
use crate::loader::{NoLoader, ReferenceLoader};
use crate::parser::Parser;
use crate::registry::{resolve_pending, ResourceRegistry};
use crate::validator::Schema;

/// How `format` behaves in annotation dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Formats only annotate.
    #[default]
    Off,
    /// Known formats assert; unknown names are ignored.
    Known,
    /// Known formats assert; unknown names fail.
    Strict,
}

/// Configuration for a new context.
pub struct ContextOptions {
    pub default_dialect: Url,
    pub mode: ValidationMode,
    /// Base URI for documents that do not declare `$id` at their root.
    pub base_uri: Option<Url>,
    /// Additional formats, taking precedence over dialect formats.
    pub formats: Vec<Format>,
    pub loader: Arc<dyn ReferenceLoader>,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            default_dialect: dialect::draft_2020_12_uri(),
            mode: ValidationMode::default(),
            base_uri: None,
            formats: Vec::new(),
            loader: Arc::new(NoLoader),
        }
    }
}

impl ContextOptions {
    pub fn with_default_dialect(mut self, uri: Url) -> Self {
        self.default_dialect = uri;
        self
    }

    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_base_uri(mut self, base: Url) -> Self {
        self.base_uri = Some(base);
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.formats.push(format);
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn ReferenceLoader>) -> Self {
        self.loader = loader;
        self
    }
}

/// Identity of one schema position. Two positions with equal contents are
/// still distinct nodes and own distinct resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Bool(bool),
    Object,
}

#[derive(Debug)]
pub(crate) struct NodeData {
    pub doc: usize,
    /// Escaped JSON pointer from the document root ("" for the root).
    pub pointer: String,
    pub kind: NodeKind,
}

#[derive(Debug)]
pub(crate) struct Document {
    pub value: Value,
    pub base: Url,
}

pub struct Context {
    pub(crate) docs: Vec<Document>,
    pub(crate) nodes: Vec<NodeData>,
    node_index: HashMap<(usize, String), NodeId>,
    pub(crate) registry: ResourceRegistry,
    pub(crate) dialects: HashMap<Url, Arc<Dialect>>,
    pub(crate) default_dialect: Url,
    pub(crate) formats: HashMap<String, Format>,
    pub(crate) mode: ValidationMode,
    patterns: HashMap<String, Arc<Regex>>,
    pub(crate) loader: Arc<dyn ReferenceLoader>,
    base_uri: Option<Url>,
}

impl Context {
    pub fn new() -> Self {
        Self::with_options(ContextOptions::default())
    }

    pub fn with_options(options: ContextOptions) -> Self {
        let mut dialects = HashMap::new();
        for d in dialect::standard_dialects() {
            dialects.insert(d.uri.clone(), Arc::new(d));
        }
        let mut formats = HashMap::new();
        for format in options.formats {
            formats.insert(format.name().to_string(), format);
        }
        Self {
            docs: Vec::new(),
            nodes: Vec::new(),
            node_index: HashMap::new(),
            registry: ResourceRegistry::default(),
            dialects,
            default_dialect: options.default_dialect,
            formats,
            mode: options.mode,
            patterns: HashMap::new(),
            loader: options.loader,
            base_uri: options.base_uri,
        }
    }

    /// Parse a schema document. Suspends only if reference resolution needs
    /// the loader.
    pub async fn parse(&mut self, document: Value) -> Result<Schema> {
        let base = match &self.base_uri {
            Some(base) => base.clone(),
            None => synthetic_base(self.docs.len()),
        };
        self.parse_with_base(document, base).await
    }

    /// Parse a schema document with an explicit base URI.
    pub async fn parse_with_base(&mut self, document: Value, base: Url) -> Result<Schema> {
        let root = self.add_document(document, base)?;
        resolve_pending(self).await?;
        Ok(Schema { root })
    }

    /// Interpret a document as a meta-schema: parse it, read `$vocabulary`,
    /// and register the resulting dialect under the document's `$id`.
    pub async fn parse_dialect(&mut self, document: Value) -> Result<Url> {
        let schema = self.parse(document).await?;
        dialect::register_from_meta(self, schema.root())
    }

    /// Register an additional format, taking precedence over dialect formats.
    pub fn add_format(&mut self, format: Format) {
        self.formats.insert(format.name().to_string(), format);
    }

    pub fn validation_mode(&self) -> ValidationMode {
        self.mode
    }

    /// Walk a new document and register its resources. Pending references
    /// are left queued for the resolution pass.
    pub(crate) fn add_document(&mut self, value: Value, base: Url) -> Result<NodeId> {
        debug!(base = %base, "parsing schema document");
        let doc = self.docs.len();
        self.docs.push(Document { value, base });
        Parser::parse_document(self, doc)
    }

    pub(crate) fn intern(&mut self, doc: usize, pointer: String, kind: NodeKind) -> NodeId {
        if let Some(id) = self.node_index.get(&(doc, pointer.clone())) {
            return *id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            doc,
            pointer: pointer.clone(),
            kind,
        });
        self.node_index.insert((doc, pointer), id);
        id
    }

    pub(crate) fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    pub(crate) fn node_at(&self, doc: usize, pointer: &str) -> Option<NodeId> {
        self.node_index.get(&(doc, pointer.to_string())).copied()
    }

    pub(crate) fn node_value(&self, id: NodeId) -> &Value {
        let data = self.node(id);
        self.docs[data.doc]
            .value
            .pointer(&data.pointer)
            .expect("interned node position exists in its document")
    }

    pub(crate) fn dialect(&self, uri: &Url) -> Option<Arc<Dialect>> {
        self.dialects.get(uri).cloned()
    }

    /// Compile and memoize a pattern. All patterns a schema uses are
    /// compiled here at parse time; validation reads the cache only.
    pub(crate) fn pattern_for(&mut self, pattern: &str) -> Result<Arc<Regex>> {
        if let Some(regex) = self.patterns.get(pattern) {
            return Ok(regex.clone());
        }
        let regex = Regex::new(pattern).map_err(|e| SchemaError::InvalidRegex {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        let regex = Arc::new(regex);
        self.patterns.insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    pub(crate) fn pattern(&self, pattern: &str) -> Option<Arc<Regex>> {
        self.patterns.get(pattern).cloned()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

fn synthetic_base(doc: usize) -> Url {
    Url::parse(&format!("json-schema:///doc{doc}")).expect("synthetic base is a valid URL")
}
