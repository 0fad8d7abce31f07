//! Validate pipeline
//!
//! Validation walks the schema and instance in lockstep. Every subschema
//! application and every keyword invocation pushes a frame; frames that own
//! an output unit collect the results of everything beneath them. The frame
//! stack is also the *dynamic scope*: `$dynamicRef` and the `unevaluated`
//! keywords query it directly.

use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::context::{Context, NodeId, NodeKind};
use crate::dialect::Dialect;
use crate::error::{Result, SchemaError};
use crate::output::{Checkpoint, OutputUnit};
use crate::value::push_token;

/// Handle to a parsed schema. Cheap to copy; validation needs the context
/// that parsed it.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub(crate) root: NodeId,
}

impl Schema {
    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    /// Validate an instance, producing the full output tree. Synchronous:
    /// validation never loads references.
    pub fn validate(&self, ctx: &Context, instance: &Value) -> Result<OutputUnit> {
        let mut ev = Evaluation {
            ctx,
            frames: Vec::new(),
        };
        let absolute = ev.absolute_location(self.root, None);
        let output = OutputUnit::new(String::new(), absolute, String::new());
        let frame = Frame {
            node: Some(self.root),
            schema_segments: Vec::new(),
            instance_segment: None,
            output: Some(output),
        };
        let (result, mut frame) = ev.in_frame(frame, |ev| ev.validate_node(self.root, instance));
        result?;
        Ok(frame.output.take().expect("root frame owns its output"))
    }

    /// Boolean shortcut over [`Schema::validate`].
    pub fn is_valid(&self, ctx: &Context, instance: &Value) -> Result<bool> {
        Ok(self.validate(ctx, instance)?.valid)
    }
}

/// A keyword invocation: the owning schema object, the key, its value, and
/// the instance under evaluation.
#[derive(Debug, Clone, Copy)]
pub struct Kw<'c> {
    pub node: NodeId,
    pub key: &'c str,
    pub value: &'c Value,
    pub instance: &'c Value,
}

#[derive(Debug)]
pub(crate) struct Frame {
    /// Set on subschema application frames; keyword frames leave it empty so
    /// the dynamic scope is exactly the chain of schema objects.
    node: Option<NodeId>,
    schema_segments: Vec<String>,
    instance_segment: Option<String>,
    output: Option<OutputUnit>,
}

/// One in-flight validation walk.
pub struct Evaluation<'c> {
    ctx: &'c Context,
    frames: Vec<Frame>,
}

impl<'c> Evaluation<'c> {
    pub(crate) fn context(&self) -> &'c Context {
        self.ctx
    }

    /// Push a frame, run `f`, and pop the frame again on every exit path.
    fn in_frame<T>(
        &mut self,
        frame: Frame,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> (Result<T>, Frame) {
        self.frames.push(frame);
        let result = f(self);
        let frame = self.frames.pop().expect("frame stack is balanced");
        (result, frame)
    }

    /// Attach a finished child output to the nearest enclosing owner.
    fn emit(&mut self, output: OutputUnit) {
        if let Some(frame) = self.frames.iter_mut().rev().find(|f| f.output.is_some()) {
            if let Some(parent) = frame.output.as_mut() {
                parent.absorb(output);
            }
        }
    }

    /// Apply a subschema to (part of) the instance. The application gets its
    /// own frame and output; returns whether the subschema accepted.
    pub(crate) fn apply(
        &mut self,
        node: NodeId,
        instance: &Value,
        schema_segments: Vec<String>,
        instance_segment: Option<String>,
    ) -> Result<bool> {
        let mut keyword_location = self.keyword_location();
        for segment in &schema_segments {
            keyword_location = push_token(&keyword_location, segment);
        }
        let mut instance_location = self.instance_location();
        if let Some(segment) = &instance_segment {
            instance_location = push_token(&instance_location, segment);
        }
        let absolute = self.absolute_location(node, None);
        let output = OutputUnit::new(keyword_location, absolute, instance_location);
        let frame = Frame {
            node: Some(node),
            schema_segments,
            instance_segment,
            output: Some(output),
        };
        let (result, mut frame) = self.in_frame(frame, |ev| ev.validate_node(node, instance));
        result?;
        let output = frame.output.take().expect("application frame owns its output");
        let valid = output.valid;
        self.emit(output);
        Ok(valid)
    }

    /// Run a schema node's keyword program against an instance, writing into
    /// the current frame's output.
    fn validate_node(&mut self, node: NodeId, instance: &Value) -> Result<()> {
        let ctx = self.ctx;
        match ctx.node(node).kind {
            NodeKind::Bool(true) => Ok(()),
            NodeKind::Bool(false) => {
                self.out().fail("never valid");
                Ok(())
            }
            NodeKind::Object => {
                let rid = ctx
                    .registry
                    .lookup_by_node(node)
                    .ok_or(SchemaError::UninitializedSchema)?;
                let resource = ctx.registry.resource(rid);
                let object = ctx
                    .node_value(node)
                    .as_object()
                    .ok_or(SchemaError::UninitializedSchema)?;
                for entry in &resource.program {
                    let value = object
                        .get(entry.key.as_str())
                        .ok_or(SchemaError::UninitializedSchema)?;
                    let kw = Kw {
                        node,
                        key: entry.key.as_str(),
                        value,
                        instance,
                    };
                    let output = OutputUnit::new(
                        push_token(&self.keyword_location(), &entry.key),
                        self.absolute_location(node, Some(&entry.key)),
                        self.instance_location(),
                    );
                    let frame = Frame {
                        node: None,
                        schema_segments: vec![entry.key.clone()],
                        instance_segment: None,
                        output: Some(output),
                    };
                    let (result, mut frame) =
                        self.in_frame(frame, |ev| (entry.keyword.validate)(ev, kw));
                    result?;
                    self.emit(frame.output.take().expect("keyword frame owns its output"));
                }
                Ok(())
            }
        }
    }

    /// The output unit of the current frame.
    pub(crate) fn out(&mut self) -> &mut OutputUnit {
        self.frames
            .iter_mut()
            .rev()
            .find_map(|f| f.output.as_mut())
            .expect("an output frame is in scope")
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.out().fail(message);
    }

    pub(crate) fn annotate(&mut self, value: Value) {
        self.out().annotate(value);
    }

    pub(crate) fn checkpoint(&mut self) -> Checkpoint {
        self.out().checkpoint()
    }

    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        self.out().restore(checkpoint);
    }

    /// Keyword location: concatenation of every frame's schema segments.
    pub(crate) fn keyword_location(&self) -> String {
        let mut location = String::new();
        for frame in &self.frames {
            for segment in &frame.schema_segments {
                location = push_token(&location, segment);
            }
        }
        location
    }

    /// Instance location: concatenation of every frame's instance segment.
    pub(crate) fn instance_location(&self) -> String {
        let mut location = String::new();
        for frame in &self.frames {
            if let Some(segment) = &frame.instance_segment {
                location = push_token(&location, segment);
            }
        }
        location
    }

    /// Absolute URI of a schema node (optionally a keyword within it):
    /// the scope root's base URI with the node's pointer as fragment.
    pub(crate) fn absolute_location(&self, node: NodeId, key: Option<&str>) -> Option<String> {
        let rid = self.ctx.registry.lookup_by_node(node)?;
        let resource = self.ctx.registry.resource(rid);
        let scope = self.ctx.registry.resource(resource.scope);
        let scope_pointer = &self.ctx.node(scope.node).pointer;
        let node_pointer = &self.ctx.node(node).pointer;
        let relative = node_pointer
            .strip_prefix(scope_pointer.as_str())
            .unwrap_or(node_pointer);
        let mut fragment = relative.to_string();
        if let Some(key) = key {
            fragment = push_token(&fragment, key);
        }
        let mut uri = scope.base_uri.clone();
        uri.set_fragment(Some(&fragment));
        Some(uri.to_string())
    }

    /// Look up the interned node for a subschema position under `node`.
    pub(crate) fn subschema(&self, node: NodeId, segments: &[&str]) -> Result<NodeId> {
        let data = self.ctx.node(node);
        let mut pointer = data.pointer.clone();
        for segment in segments {
            pointer = push_token(&pointer, segment);
        }
        self.ctx
            .node_at(data.doc, &pointer)
            .ok_or(SchemaError::UninitializedSchema)
    }

    /// Raw value of a sibling keyword in the same schema object.
    pub(crate) fn sibling_value(&self, node: NodeId, key: &str) -> Option<&'c Value> {
        self.ctx.node_value(node).as_object()?.get(key)
    }

    /// Annotation of a sibling keyword in the same schema object, if that
    /// keyword has already run and succeeded.
    pub(crate) fn sibling_annotation(&self, key: &str) -> Option<Value> {
        self.sibling_annotations(&[key]).pop()
    }

    /// Annotations of sibling keywords in the same schema object. Matching
    /// is by exact keyword location, so same-named keywords from nested
    /// subschemas never alias.
    pub(crate) fn sibling_annotations(&self, keys: &[&str]) -> Vec<Value> {
        let mut found = Vec::new();
        if self.frames.len() < 2 {
            return found;
        }
        let below_top = &self.frames[..self.frames.len() - 1];
        let Some(owner) = below_top.iter().rposition(|f| f.output.is_some()) else {
            return found;
        };
        let mut prefix = String::new();
        for frame in &self.frames[..=owner] {
            for segment in &frame.schema_segments {
                prefix = push_token(&prefix, segment);
            }
        }
        let output = self.frames[owner]
            .output
            .as_ref()
            .expect("owner frame has output");
        for unit in &output.annotations {
            if !unit.valid {
                continue;
            }
            let Some(annotation) = &unit.annotation else {
                continue;
            };
            if keys
                .iter()
                .any(|k| unit.keyword_location == push_token(&prefix, k))
            {
                found.push(annotation.clone());
            }
        }
        found
    }

    /// Annotations for the current instance location anywhere in the dynamic
    /// scope, matched by keyword name. This crosses schema objects: results
    /// from `allOf` branches, `$ref` targets, and conditionals all count,
    /// provided they validated successfully.
    pub(crate) fn dynamic_annotations(&self, keys: &[&str]) -> Vec<Value> {
        let instance_location = self.instance_location();
        let mut found = Vec::new();
        for frame in &self.frames {
            if let Some(output) = &frame.output {
                let mut hits = Vec::new();
                output.find_annotations(&instance_location, keys, &mut hits);
                found.extend(hits.into_iter().cloned());
            }
        }
        found
    }

    /// Schema objects on the dynamic scope, outermost first.
    pub(crate) fn dynamic_scope(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.frames.iter().filter_map(|f| f.node)
    }

    /// Compiled pattern from the context cache. Every pattern a parsed
    /// schema mentions was compiled during parse, so a miss means the schema
    /// does not belong to this context.
    pub(crate) fn pattern(&self, pattern: &str) -> Result<Arc<Regex>> {
        self.ctx
            .pattern(pattern)
            .ok_or(SchemaError::UninitializedSchema)
    }

    /// Dialect of the innermost schema object currently being validated.
    pub(crate) fn current_dialect(&self) -> Result<Arc<Dialect>> {
        let rid = self
            .frames
            .iter()
            .rev()
            .filter_map(|f| f.node)
            .find_map(|node| self.ctx.registry.lookup_by_node(node))
            .ok_or(SchemaError::UninitializedSchema)?;
        let uri = self.ctx.registry.resource(rid).dialect.clone();
        self.ctx
            .dialect(&uri)
            .ok_or(SchemaError::UninitializedSchema)
    }
}
