//! Keyword catalog
//!
//! The concrete keyword tables, grouped the way the 2020-12 vocabularies
//! group them, plus the combined draft-07/draft-04 sets and the OpenAPI
//! base extensions. Dialects are assembled from these tables.

pub(crate) mod annotation;
pub(crate) mod applicator;
pub(crate) mod core;
pub(crate) mod unevaluated;
pub(crate) mod validation;

use serde_json::Value;

use crate::context::NodeId;
use crate::error::{Result, SchemaError};
use crate::keyword::Keyword;
use crate::parser::Parser;
use crate::value::type_name;

pub(crate) use annotation::unknown_keyword;

use annotation::{annotation_keyword, parse_any, validate_nothing};

/// Virtual barrier: applicators run before it, `unevaluated*` after it.
pub(crate) const UNEVALUATED: &str = "@unevaluated";

const AFTER: &[&str] = &[UNEVALUATED];

pub(crate) fn invalid_value(
    parser: &Parser<'_>,
    node: NodeId,
    key: &str,
    reason: impl Into<String>,
) -> SchemaError {
    SchemaError::InvalidKeywordValue {
        keyword: key.to_string(),
        location: parser.location(node, key),
        reason: reason.into(),
    }
}

pub(crate) fn string_value(parser: &Parser<'_>, node: NodeId, key: &str) -> Result<String> {
    match parser.value(node, key) {
        Value::String(s) => Ok(s.clone()),
        other => {
            let reason = format!("expected string, got {}", type_name(other));
            Err(invalid_value(parser, node, key, reason))
        }
    }
}

const fn keyword(
    name: &'static str,
    dependencies: &'static [&'static str],
    dependents: &'static [&'static str],
    parse: crate::keyword::ParseFn,
    validate: crate::keyword::ValidateFn,
) -> Keyword {
    Keyword {
        name,
        dependencies,
        dependents,
        parse,
        validate,
    }
}

// ---------------------------------------------------------------------------
// 2020-12 vocabularies

pub(crate) const CORE_2020: &[Keyword] = &[
    keyword("$schema", &[], &[], core::parse_noop, validate_nothing),
    keyword("$vocabulary", &[], &[], core::parse_vocabulary, validate_nothing),
    keyword("$id", &[], &[], core::parse_noop, validate_nothing),
    keyword("$anchor", &[], &[], core::parse_anchor, validate_nothing),
    keyword("$dynamicAnchor", &[], &[], core::parse_dynamic_anchor, validate_nothing),
    keyword("$ref", &[], AFTER, core::parse_ref, core::validate_ref),
    keyword("$dynamicRef", &[], AFTER, core::parse_dynamic_ref, core::validate_dynamic_ref),
    keyword("$defs", &[], &[], core::parse_defs, validate_nothing),
    keyword("$comment", &[], &[], core::parse_comment, validate_nothing),
];

pub(crate) const APPLICATOR_2020: &[Keyword] = &[
    keyword("allOf", &[], AFTER, applicator::parse_schema_array, applicator::validate_all_of),
    keyword("anyOf", &[], AFTER, applicator::parse_schema_array, applicator::validate_any_of),
    keyword("oneOf", &[], AFTER, applicator::parse_schema_array, applicator::validate_one_of),
    keyword("not", &[], AFTER, applicator::parse_schema, applicator::validate_not),
    keyword("if", &[], AFTER, applicator::parse_schema, applicator::validate_if),
    keyword("then", &["if"], AFTER, applicator::parse_schema, applicator::validate_then),
    keyword("else", &["if"], AFTER, applicator::parse_schema, applicator::validate_else),
    keyword(
        "dependentSchemas",
        &[],
        AFTER,
        applicator::parse_schema_map,
        applicator::validate_dependent_schemas,
    ),
    keyword(
        "prefixItems",
        &[],
        AFTER,
        applicator::parse_schema_array,
        applicator::validate_prefix_items,
    ),
    keyword(
        "items",
        &["prefixItems"],
        AFTER,
        applicator::parse_schema,
        applicator::validate_items,
    ),
    keyword("contains", &[], AFTER, applicator::parse_schema, applicator::validate_contains),
    keyword(
        "properties",
        &[],
        AFTER,
        applicator::parse_schema_map,
        applicator::validate_properties,
    ),
    keyword(
        "patternProperties",
        &[],
        AFTER,
        applicator::parse_pattern_properties,
        applicator::validate_pattern_properties,
    ),
    keyword(
        "additionalProperties",
        &["properties", "patternProperties"],
        AFTER,
        applicator::parse_schema,
        applicator::validate_additional_properties,
    ),
    keyword(
        "propertyNames",
        &[],
        AFTER,
        applicator::parse_schema,
        applicator::validate_property_names,
    ),
];

pub(crate) const UNEVALUATED_2020: &[Keyword] = &[
    keyword(
        "unevaluatedItems",
        &[UNEVALUATED],
        &[],
        applicator::parse_schema,
        unevaluated::validate_unevaluated_items,
    ),
    keyword(
        "unevaluatedProperties",
        &[UNEVALUATED],
        &[],
        applicator::parse_schema,
        unevaluated::validate_unevaluated_properties,
    ),
];

pub(crate) const VALIDATION_2020: &[Keyword] = &[
    keyword("type", &[], &[], validation::parse_type, validation::validate_type),
    keyword("enum", &[], &[], validation::parse_enum, validation::validate_enum),
    keyword("const", &[], &[], parse_any, validation::validate_const),
    keyword(
        "multipleOf",
        &[],
        &[],
        validation::parse_positive_number,
        validation::validate_multiple_of,
    ),
    keyword("maximum", &[], &[], validation::parse_number, validation::validate_maximum),
    keyword(
        "exclusiveMaximum",
        &[],
        &[],
        validation::parse_number,
        validation::validate_exclusive_maximum,
    ),
    keyword("minimum", &[], &[], validation::parse_number, validation::validate_minimum),
    keyword(
        "exclusiveMinimum",
        &[],
        &[],
        validation::parse_number,
        validation::validate_exclusive_minimum,
    ),
    keyword("maxLength", &[], &[], validation::parse_count, validation::validate_max_length),
    keyword("minLength", &[], &[], validation::parse_count, validation::validate_min_length),
    keyword("pattern", &[], &[], validation::parse_pattern, validation::validate_pattern),
    keyword("maxItems", &[], &[], validation::parse_count, validation::validate_max_items),
    keyword("minItems", &[], &[], validation::parse_count, validation::validate_min_items),
    keyword(
        "uniqueItems",
        &[],
        &[],
        validation::parse_boolean,
        validation::validate_unique_items,
    ),
    keyword(
        "maxContains",
        &["contains"],
        &[],
        validation::parse_count,
        validation::validate_max_contains,
    ),
    keyword(
        "minContains",
        &["contains"],
        &[],
        validation::parse_count,
        validation::validate_min_contains,
    ),
    keyword(
        "maxProperties",
        &[],
        &[],
        validation::parse_count,
        validation::validate_max_properties,
    ),
    keyword(
        "minProperties",
        &[],
        &[],
        validation::parse_count,
        validation::validate_min_properties,
    ),
    keyword("required", &[], &[], validation::parse_required, validation::validate_required),
    keyword(
        "dependentRequired",
        &[],
        &[],
        validation::parse_dependent_required,
        validation::validate_dependent_required,
    ),
];

pub(crate) const FORMAT_ANNOTATION: &[Keyword] = &[keyword(
    "format",
    &[],
    &[],
    validation::parse_format,
    validation::validate_format,
)];

pub(crate) const FORMAT_ASSERTION: &[Keyword] = FORMAT_ANNOTATION;

pub(crate) const CONTENT: &[Keyword] = &[
    annotation_keyword("contentEncoding"),
    annotation_keyword("contentMediaType"),
    annotation_keyword("contentSchema"),
];

pub(crate) const META_DATA: &[Keyword] = &[
    annotation_keyword("title"),
    annotation_keyword("description"),
    annotation_keyword("default"),
    annotation_keyword("deprecated"),
    annotation_keyword("readOnly"),
    annotation_keyword("writeOnly"),
    annotation_keyword("examples"),
];

/// OpenAPI 3.1 base vocabulary: annotation-only extensions.
pub(crate) const OPENAPI_BASE: &[Keyword] = &[
    annotation_keyword("discriminator"),
    annotation_keyword("xml"),
    annotation_keyword("externalDocs"),
    annotation_keyword("example"),
];

// ---------------------------------------------------------------------------
// Draft 07 / Draft 04

pub(crate) const DRAFT07: &[Keyword] = &[
    keyword("$schema", &[], &[], core::parse_noop, validate_nothing),
    keyword("$id", &[], &[], core::parse_noop, validate_nothing),
    keyword("$ref", &[], &[], core::parse_ref, core::validate_ref),
    keyword("$comment", &[], &[], core::parse_comment, validate_nothing),
    keyword("definitions", &[], &[], core::parse_defs, validate_nothing),
    keyword("allOf", &[], &[], applicator::parse_schema_array, applicator::validate_all_of),
    keyword("anyOf", &[], &[], applicator::parse_schema_array, applicator::validate_any_of),
    keyword("oneOf", &[], &[], applicator::parse_schema_array, applicator::validate_one_of),
    keyword("not", &[], &[], applicator::parse_schema, applicator::validate_not),
    keyword("if", &[], &[], applicator::parse_schema, applicator::validate_if),
    keyword("then", &["if"], &[], applicator::parse_schema, applicator::validate_then),
    keyword("else", &["if"], &[], applicator::parse_schema, applicator::validate_else),
    keyword(
        "items",
        &[],
        &[],
        applicator::parse_items_draft7,
        applicator::validate_items_draft7,
    ),
    keyword(
        "additionalItems",
        &["items"],
        &[],
        applicator::parse_schema,
        applicator::validate_additional_items,
    ),
    keyword("contains", &[], &[], applicator::parse_schema, applicator::validate_contains),
    keyword(
        "properties",
        &[],
        &[],
        applicator::parse_schema_map,
        applicator::validate_properties,
    ),
    keyword(
        "patternProperties",
        &[],
        &[],
        applicator::parse_pattern_properties,
        applicator::validate_pattern_properties,
    ),
    keyword(
        "additionalProperties",
        &["properties", "patternProperties"],
        &[],
        applicator::parse_schema,
        applicator::validate_additional_properties,
    ),
    keyword(
        "propertyNames",
        &[],
        &[],
        applicator::parse_schema,
        applicator::validate_property_names,
    ),
    keyword(
        "dependencies",
        &[],
        &[],
        applicator::parse_dependencies,
        applicator::validate_dependencies,
    ),
    keyword("type", &[], &[], validation::parse_type, validation::validate_type),
    keyword("enum", &[], &[], validation::parse_enum, validation::validate_enum),
    keyword("const", &[], &[], parse_any, validation::validate_const),
    keyword(
        "multipleOf",
        &[],
        &[],
        validation::parse_positive_number,
        validation::validate_multiple_of,
    ),
    keyword("maximum", &[], &[], validation::parse_number, validation::validate_maximum),
    keyword(
        "exclusiveMaximum",
        &[],
        &[],
        validation::parse_number,
        validation::validate_exclusive_maximum,
    ),
    keyword("minimum", &[], &[], validation::parse_number, validation::validate_minimum),
    keyword(
        "exclusiveMinimum",
        &[],
        &[],
        validation::parse_number,
        validation::validate_exclusive_minimum,
    ),
    keyword("maxLength", &[], &[], validation::parse_count, validation::validate_max_length),
    keyword("minLength", &[], &[], validation::parse_count, validation::validate_min_length),
    keyword("pattern", &[], &[], validation::parse_pattern, validation::validate_pattern),
    keyword("maxItems", &[], &[], validation::parse_count, validation::validate_max_items),
    keyword("minItems", &[], &[], validation::parse_count, validation::validate_min_items),
    keyword(
        "uniqueItems",
        &[],
        &[],
        validation::parse_boolean,
        validation::validate_unique_items,
    ),
    keyword(
        "maxProperties",
        &[],
        &[],
        validation::parse_count,
        validation::validate_max_properties,
    ),
    keyword(
        "minProperties",
        &[],
        &[],
        validation::parse_count,
        validation::validate_min_properties,
    ),
    keyword("required", &[], &[], validation::parse_required, validation::validate_required),
    keyword("format", &[], &[], validation::parse_format, validation::validate_format),
    annotation_keyword("title"),
    annotation_keyword("description"),
    annotation_keyword("default"),
    annotation_keyword("examples"),
    annotation_keyword("readOnly"),
    annotation_keyword("writeOnly"),
    annotation_keyword("contentEncoding"),
    annotation_keyword("contentMediaType"),
];

pub(crate) const DRAFT04: &[Keyword] = &[
    keyword("$schema", &[], &[], core::parse_noop, validate_nothing),
    keyword("id", &[], &[], core::parse_noop, validate_nothing),
    keyword("$ref", &[], &[], core::parse_ref, core::validate_ref),
    keyword("definitions", &[], &[], core::parse_defs, validate_nothing),
    keyword("allOf", &[], &[], applicator::parse_schema_array, applicator::validate_all_of),
    keyword("anyOf", &[], &[], applicator::parse_schema_array, applicator::validate_any_of),
    keyword("oneOf", &[], &[], applicator::parse_schema_array, applicator::validate_one_of),
    keyword("not", &[], &[], applicator::parse_schema, applicator::validate_not),
    keyword(
        "items",
        &[],
        &[],
        applicator::parse_items_draft7,
        applicator::validate_items_draft7,
    ),
    keyword(
        "additionalItems",
        &["items"],
        &[],
        applicator::parse_schema,
        applicator::validate_additional_items,
    ),
    keyword(
        "properties",
        &[],
        &[],
        applicator::parse_schema_map,
        applicator::validate_properties,
    ),
    keyword(
        "patternProperties",
        &[],
        &[],
        applicator::parse_pattern_properties,
        applicator::validate_pattern_properties,
    ),
    keyword(
        "additionalProperties",
        &["properties", "patternProperties"],
        &[],
        applicator::parse_schema,
        applicator::validate_additional_properties,
    ),
    keyword(
        "dependencies",
        &[],
        &[],
        applicator::parse_dependencies,
        applicator::validate_dependencies,
    ),
    keyword("type", &[], &[], validation::parse_type, validation::validate_type),
    keyword("enum", &[], &[], validation::parse_enum, validation::validate_enum),
    keyword(
        "multipleOf",
        &[],
        &[],
        validation::parse_positive_number,
        validation::validate_multiple_of,
    ),
    keyword(
        "maximum",
        &[],
        &[],
        validation::parse_number,
        validation::validate_maximum_draft4,
    ),
    keyword(
        "exclusiveMaximum",
        &["maximum"],
        &[],
        validation::parse_boolean,
        validate_nothing,
    ),
    keyword(
        "minimum",
        &[],
        &[],
        validation::parse_number,
        validation::validate_minimum_draft4,
    ),
    keyword(
        "exclusiveMinimum",
        &["minimum"],
        &[],
        validation::parse_boolean,
        validate_nothing,
    ),
    keyword("maxLength", &[], &[], validation::parse_count, validation::validate_max_length),
    keyword("minLength", &[], &[], validation::parse_count, validation::validate_min_length),
    keyword("pattern", &[], &[], validation::parse_pattern, validation::validate_pattern),
    keyword("maxItems", &[], &[], validation::parse_count, validation::validate_max_items),
    keyword("minItems", &[], &[], validation::parse_count, validation::validate_min_items),
    keyword(
        "uniqueItems",
        &[],
        &[],
        validation::parse_boolean,
        validation::validate_unique_items,
    ),
    keyword(
        "maxProperties",
        &[],
        &[],
        validation::parse_count,
        validation::validate_max_properties,
    ),
    keyword(
        "minProperties",
        &[],
        &[],
        validation::parse_count,
        validation::validate_min_properties,
    ),
    keyword("required", &[], &[], validation::parse_required, validation::validate_required),
    keyword("format", &[], &[], validation::parse_format, validation::validate_format),
    annotation_keyword("title"),
    annotation_keyword("description"),
    annotation_keyword("default"),
];

// ---------------------------------------------------------------------------
// Vocabulary lookup (for `$vocabulary`-built dialects)

pub(crate) const VOCAB_CORE: &str = "https://json-schema.org/draft/2020-12/vocab/core";
pub(crate) const VOCAB_APPLICATOR: &str = "https://json-schema.org/draft/2020-12/vocab/applicator";
pub(crate) const VOCAB_UNEVALUATED: &str = "https://json-schema.org/draft/2020-12/vocab/unevaluated";
pub(crate) const VOCAB_VALIDATION: &str = "https://json-schema.org/draft/2020-12/vocab/validation";
pub(crate) const VOCAB_FORMAT_ANNOTATION: &str =
    "https://json-schema.org/draft/2020-12/vocab/format-annotation";
pub(crate) const VOCAB_FORMAT_ASSERTION: &str =
    "https://json-schema.org/draft/2020-12/vocab/format-assertion";
pub(crate) const VOCAB_CONTENT: &str = "https://json-schema.org/draft/2020-12/vocab/content";
pub(crate) const VOCAB_META_DATA: &str = "https://json-schema.org/draft/2020-12/vocab/meta-data";
pub(crate) const VOCAB_OPENAPI_BASE: &str = "https://spec.openapis.org/oas/3.1/vocab/base";

pub(crate) fn vocabulary(uri: &str) -> Option<&'static [Keyword]> {
    match uri {
        VOCAB_CORE => Some(CORE_2020),
        VOCAB_APPLICATOR => Some(APPLICATOR_2020),
        VOCAB_UNEVALUATED => Some(UNEVALUATED_2020),
        VOCAB_VALIDATION => Some(VALIDATION_2020),
        VOCAB_FORMAT_ANNOTATION => Some(FORMAT_ANNOTATION),
        VOCAB_FORMAT_ASSERTION => Some(FORMAT_ASSERTION),
        VOCAB_CONTENT => Some(CONTENT),
        VOCAB_META_DATA => Some(META_DATA),
        VOCAB_OPENAPI_BASE => Some(OPENAPI_BASE),
        _ => None,
    }
}
