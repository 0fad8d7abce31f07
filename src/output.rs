//! Validation output tree
//!
//! Every keyword invocation and every subschema application produces an
//! `OutputUnit`. Units are absorbed into the nearest enclosing unit as the
//! evaluation stack unwinds, building a tree that mirrors the dynamic call
//! structure. Speculative applicators (`not`, `anyOf`, `oneOf`, `if`) use
//! checkpoints to discard effects that must not alter validity.

use serde::Serialize;
use serde_json::Value;

/// One node of the validation result tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputUnit {
    pub valid: bool,
    /// JSON pointer through the dynamic schema program path, including any
    /// `$ref` hops.
    pub keyword_location: String,
    /// Absolute URI of the validating keyword within its resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absolute_keyword_location: Option<String>,
    /// JSON pointer into the instance.
    pub instance_location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<OutputUnit>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<OutputUnit>,
}

/// Snapshot of the parts of an output unit a speculative evaluation may
/// disturb. Annotations are deliberately not captured: failed speculations
/// surface as invalid children, which annotation queries already skip.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    valid: bool,
    error: Option<String>,
    errors_len: usize,
}

/// A single row of the flattened error listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatError {
    pub keyword_location: String,
    pub instance_location: String,
    pub error: String,
}

impl OutputUnit {
    pub fn new(
        keyword_location: String,
        absolute_keyword_location: Option<String>,
        instance_location: String,
    ) -> Self {
        Self {
            valid: true,
            keyword_location,
            absolute_keyword_location,
            instance_location,
            error: None,
            annotation: None,
            errors: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// A unit with no error, no annotation, and no children carries no
    /// information and is dropped on absorption.
    pub fn is_empty(&self) -> bool {
        self.error.is_none()
            && self.annotation.is_none()
            && self.errors.is_empty()
            && self.annotations.is_empty()
    }

    /// Mark this unit failed with a message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.error = Some(message.into());
    }

    /// Attach an annotation value to this unit.
    pub fn annotate(&mut self, value: Value) {
        self.annotation = Some(value);
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            valid: self.valid,
            error: self.error.clone(),
            errors_len: self.errors.len(),
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.valid = checkpoint.valid;
        self.error = checkpoint.error;
        self.errors.truncate(checkpoint.errors_len);
    }

    /// Absorb a child unit produced by a nested frame.
    ///
    /// Empty children are dropped. A child that is a bare wrapper around a
    /// single nested error (or annotation) is replaced by that nested unit,
    /// keeping the tree shallow without losing locations. An invalid child
    /// invalidates this unit.
    pub fn absorb(&mut self, child: OutputUnit) {
        if child.is_empty() {
            return;
        }
        let child = hoist(child);
        if child.valid {
            self.annotations.push(child);
        } else {
            self.valid = false;
            self.errors.push(child);
        }
    }

    /// Search the annotation subtree for units whose keyword location ends in
    /// one of `suffixes` and whose instance location equals
    /// `instance_location`. Only valid units are visited, so effects of
    /// failed subschemas never leak into the result.
    pub fn find_annotations<'a>(
        &'a self,
        instance_location: &str,
        suffixes: &[&str],
        found: &mut Vec<&'a Value>,
    ) {
        for unit in &self.annotations {
            if !unit.valid {
                continue;
            }
            if let Some(annotation) = &unit.annotation {
                if unit.instance_location == instance_location
                    && suffixes.iter().any(|s| keyword_of(&unit.keyword_location) == *s)
                {
                    found.push(annotation);
                }
            }
            unit.find_annotations(instance_location, suffixes, found);
        }
    }

    /// Flatten the error subtree into rows for human-facing reporting.
    pub fn flattened(&self) -> Vec<FlatError> {
        let mut rows = Vec::new();
        self.collect_flat(&mut rows);
        rows
    }

    fn collect_flat(&self, rows: &mut Vec<FlatError>) {
        if let Some(error) = &self.error {
            rows.push(FlatError {
                keyword_location: self.keyword_location.clone(),
                instance_location: self.instance_location.clone(),
                error: error.clone(),
            });
        }
        for child in &self.errors {
            child.collect_flat(rows);
        }
    }
}

/// Last reference token of a keyword location pointer.
fn keyword_of(location: &str) -> &str {
    location.rsplit('/').next().unwrap_or("")
}

fn hoist(mut unit: OutputUnit) -> OutputUnit {
    // A wrapper whose only content is one nested error stands in for it.
    if unit.error.is_none()
        && unit.annotation.is_none()
        && unit.annotations.is_empty()
        && unit.errors.len() == 1
    {
        return unit.errors.pop().expect("length checked");
    }
    if unit.error.is_none()
        && unit.annotation.is_none()
        && unit.errors.is_empty()
        && unit.annotations.len() == 1
    {
        return unit.annotations.pop().expect("length checked");
    }
    unit
}
