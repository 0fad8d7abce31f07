//! Annotation-only keywords
//!
//! Meta-data and content keywords, plus the descriptor every unrecognized
//! key falls back to: parse accepts anything, validate records the value as
//! an annotation at the current location. Unknown keywords therefore never
//! cause validation failure.

use crate::context::NodeId;
use crate::error::Result;
use crate::keyword::Keyword;
use crate::parser::Parser;
use crate::validator::{Evaluation, Kw};

pub(crate) fn parse_any(_: &mut Parser<'_>, _: NodeId, _: &str) -> Result<()> {
    Ok(())
}

pub(crate) fn validate_annotate(ev: &mut Evaluation<'_>, kw: Kw<'_>) -> Result<()> {
    ev.annotate(kw.value.clone());
    Ok(())
}

pub(crate) fn validate_nothing(_: &mut Evaluation<'_>, _: Kw<'_>) -> Result<()> {
    Ok(())
}

/// Descriptor for keys the dialect does not recognize.
pub(crate) fn unknown_keyword() -> Keyword {
    Keyword {
        name: "",
        dependencies: &[],
        dependents: &[],
        parse: parse_any,
        validate: validate_annotate,
    }
}

/// A named annotation-only keyword (`title`, `example`, ...).
pub(crate) const fn annotation_keyword(name: &'static str) -> Keyword {
    Keyword {
        name,
        dependencies: &[],
        dependents: &[],
        parse: parse_any,
        validate: validate_annotate,
    }
}
