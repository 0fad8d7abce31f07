//! Dialects and the vocabulary catalog
//!
//! A dialect bundles a keyword table, a format registry, and the vocabulary
//! URIs it was assembled from, identified by its meta-schema URI. The four
//! standard dialects are built from the static tables in [`crate::keywords`];
//! further dialects can be registered by parsing a meta-schema with a
//! `$vocabulary` object.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::context::{Context, NodeId};
use crate::error::{Result, SchemaError};
use crate::format::{standard_formats, Format};
use crate::keyword::Keyword;
use crate::keywords;

pub struct Dialect {
    pub uri: Url,
    pub(crate) keywords: HashMap<String, Keyword>,
    pub(crate) formats: HashMap<String, Format>,
    pub(crate) vocabularies: Vec<String>,
    /// When set, `format` always asserts and unknown names fail.
    pub(crate) format_assertion: bool,
    /// `$id` in modern dialects, `id` in draft-04.
    pub(crate) id_key: &'static str,
    /// Older dialects allow a plain-name fragment in the id, doubling as an
    /// anchor; 2020-12 forbids any fragment there.
    pub(crate) id_fragment_as_anchor: bool,
}

impl std::fmt::Debug for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dialect")
            .field("uri", &self.uri.as_str())
            .field("keywords", &self.keywords.len())
            .field("vocabularies", &self.vocabularies)
            .finish()
    }
}

pub fn draft_2020_12_uri() -> Url {
    Url::parse("https://json-schema.org/draft/2020-12/schema").expect("valid dialect URI")
}

pub fn draft_07_uri() -> Url {
    Url::parse("http://json-schema.org/draft-07/schema#").expect("valid dialect URI")
}

pub fn draft_04_uri() -> Url {
    Url::parse("http://json-schema.org/draft-04/schema#").expect("valid dialect URI")
}

pub fn openapi_31_uri() -> Url {
    Url::parse("https://spec.openapis.org/oas/3.1/dialect/base").expect("valid dialect URI")
}

fn table(groups: &[&[Keyword]]) -> HashMap<String, Keyword> {
    let mut map = HashMap::new();
    for group in groups {
        for kw in *group {
            map.insert(kw.name.to_string(), *kw);
        }
    }
    map
}

const VOCAB_2020: &[&str] = &[
    keywords::VOCAB_CORE,
    keywords::VOCAB_APPLICATOR,
    keywords::VOCAB_UNEVALUATED,
    keywords::VOCAB_VALIDATION,
    keywords::VOCAB_FORMAT_ANNOTATION,
    keywords::VOCAB_CONTENT,
    keywords::VOCAB_META_DATA,
];

pub(crate) fn draft_2020_12() -> Dialect {
    Dialect {
        uri: draft_2020_12_uri(),
        keywords: table(&[
            keywords::CORE_2020,
            keywords::APPLICATOR_2020,
            keywords::UNEVALUATED_2020,
            keywords::VALIDATION_2020,
            keywords::FORMAT_ANNOTATION,
            keywords::CONTENT,
            keywords::META_DATA,
        ]),
        formats: standard_formats(),
        vocabularies: VOCAB_2020.iter().map(|s| s.to_string()).collect(),
        format_assertion: false,
        id_key: "$id",
        id_fragment_as_anchor: false,
    }
}

pub(crate) fn draft_07() -> Dialect {
    Dialect {
        uri: draft_07_uri(),
        keywords: table(&[keywords::DRAFT07]),
        formats: standard_formats(),
        vocabularies: Vec::new(),
        format_assertion: false,
        id_key: "$id",
        id_fragment_as_anchor: true,
    }
}

pub(crate) fn draft_04() -> Dialect {
    Dialect {
        uri: draft_04_uri(),
        keywords: table(&[keywords::DRAFT04]),
        formats: standard_formats(),
        vocabularies: Vec::new(),
        format_assertion: false,
        id_key: "id",
        id_fragment_as_anchor: true,
    }
}

pub(crate) fn openapi_31() -> Dialect {
    Dialect {
        uri: openapi_31_uri(),
        keywords: table(&[
            keywords::CORE_2020,
            keywords::APPLICATOR_2020,
            keywords::UNEVALUATED_2020,
            keywords::VALIDATION_2020,
            keywords::FORMAT_ANNOTATION,
            keywords::CONTENT,
            keywords::META_DATA,
            keywords::OPENAPI_BASE,
        ]),
        formats: standard_formats(),
        vocabularies: VOCAB_2020
            .iter()
            .chain(&[keywords::VOCAB_OPENAPI_BASE])
            .map(|s| s.to_string())
            .collect(),
        format_assertion: false,
        id_key: "$id",
        id_fragment_as_anchor: false,
    }
}

pub(crate) fn standard_dialects() -> Vec<Dialect> {
    vec![draft_2020_12(), draft_07(), draft_04(), openapi_31()]
}

/// Build a dialect from a parsed meta-schema's `$vocabulary` object and
/// register it with the context under the meta-schema's canonical URI.
///
/// A required vocabulary the catalog does not know fails with
/// `UnknownVocabulary`; optional unknown vocabularies are skipped. The core
/// vocabulary is *not* required to be listed (the OpenAPI relaxation).
pub(crate) fn register_from_meta(ctx: &mut Context, root: NodeId) -> Result<Url> {
    let object = ctx
        .node_value(root)
        .as_object()
        .ok_or(SchemaError::NotAMetaSchema)?;
    let Some(Value::Object(declared)) = object.get("$vocabulary") else {
        return Err(SchemaError::NotAMetaSchema);
    };

    let mut keyword_table = HashMap::new();
    let mut vocabularies = Vec::new();
    let mut format_assertion = false;
    for (uri, required) in declared {
        match keywords::vocabulary(uri) {
            Some(group) => {
                for kw in group {
                    keyword_table.insert(kw.name.to_string(), *kw);
                }
                if uri == keywords::VOCAB_FORMAT_ASSERTION {
                    format_assertion = true;
                }
                vocabularies.push(uri.clone());
            }
            None if required.as_bool() == Some(true) => {
                return Err(SchemaError::UnknownVocabulary { uri: uri.clone() });
            }
            None => {
                debug!(uri = %uri, "skipping unknown optional vocabulary");
            }
        }
    }

    let rid = ctx
        .registry
        .lookup_by_node(root)
        .ok_or(SchemaError::UninitializedSchema)?;
    let resource = ctx.registry.resource(rid);
    let uri = resource
        .canonical_uri
        .clone()
        .unwrap_or_else(|| resource.base_uri.clone());

    let dialect = Dialect {
        uri: uri.clone(),
        keywords: keyword_table,
        formats: standard_formats(),
        vocabularies,
        format_assertion,
        id_key: "$id",
        id_fragment_as_anchor: false,
    };
    debug!(uri = %uri, "registered dialect from meta-schema");
    ctx.dialects.insert(uri.clone(), Arc::new(dialect));
    Ok(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_2020_12_table_covers_all_vocabularies() {
        let dialect = draft_2020_12();
        for key in [
            "$ref",
            "$dynamicRef",
            "allOf",
            "unevaluatedProperties",
            "type",
            "format",
            "contentSchema",
            "title",
        ] {
            assert!(dialect.keywords.contains_key(key), "missing {key}");
        }
        assert!(!dialect.keywords.contains_key("discriminator"));
        assert_eq!(dialect.id_key, "$id");
        assert!(!dialect.id_fragment_as_anchor);
    }

    #[test]
    fn test_draft07_keeps_legacy_applicators() {
        let dialect = draft_07();
        assert!(dialect.keywords.contains_key("additionalItems"));
        assert!(dialect.keywords.contains_key("dependencies"));
        assert!(dialect.keywords.contains_key("definitions"));
        assert!(!dialect.keywords.contains_key("prefixItems"));
        assert!(!dialect.keywords.contains_key("unevaluatedProperties"));
        assert!(dialect.id_fragment_as_anchor);
    }

    #[test]
    fn test_draft04_uses_legacy_id_and_bounds() {
        let dialect = draft_04();
        assert_eq!(dialect.id_key, "id");
        assert!(dialect.keywords.contains_key("exclusiveMaximum"));
        assert!(!dialect.keywords.contains_key("const"));
        assert!(!dialect.keywords.contains_key("contains"));
    }

    #[test]
    fn test_openapi_extends_2020_12() {
        let dialect = openapi_31();
        assert!(dialect.keywords.contains_key("discriminator"));
        assert!(dialect.keywords.contains_key("unevaluatedItems"));
    }

    #[tokio::test]
    async fn test_dialect_from_meta_schema() {
        let mut ctx = Context::new();
        let uri = ctx
            .parse_dialect(serde_json::json!({
                "$id": "https://example.com/custom-dialect",
                "$vocabulary": {
                    "https://json-schema.org/draft/2020-12/vocab/core": true,
                    "https://json-schema.org/draft/2020-12/vocab/validation": true,
                    "https://example.com/vocab/experimental": false
                }
            }))
            .await
            .unwrap();
        assert_eq!(uri.as_str(), "https://example.com/custom-dialect");
        let dialect = ctx.dialect(&uri).unwrap();
        assert!(dialect.keywords.contains_key("type"));
        assert!(!dialect.keywords.contains_key("properties"));
    }

    #[tokio::test]
    async fn test_required_unknown_vocabulary_fails() {
        let mut ctx = Context::new();
        let err = ctx
            .parse_dialect(serde_json::json!({
                "$id": "https://example.com/bad-dialect",
                "$vocabulary": {
                    "https://example.com/vocab/experimental": true
                }
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownVocabulary { .. }));
    }
}
