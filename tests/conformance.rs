//! Conformance tests
//!
//! End-to-end parse + validate behavior: the literal scenarios the engine
//! must satisfy, the universal properties (boolean schemas, annotation
//! non-failure, reference transparency, key-order commutativity), and the
//! per-dialect keyword behaviors.

use serde_json::{json, Value};

use jsonschema_engine::{Context, ContextOptions, Schema, ValidationMode};

async fn parsed(schema: Value) -> (Context, Schema) {
    let mut ctx = Context::new();
    let schema = ctx.parse(schema).await.expect("schema parses");
    (ctx, schema)
}

async fn parsed_with_mode(schema: Value, mode: ValidationMode) -> (Context, Schema) {
    let mut ctx = Context::with_options(ContextOptions::default().with_mode(mode));
    let schema = ctx.parse(schema).await.expect("schema parses");
    (ctx, schema)
}

// ---------------------------------------------------------------------------
// Literal scenarios

#[tokio::test]
async fn test_basic_object_schema() {
    let (ctx, schema) = parsed(json!({
        "type": "object",
        "properties": {
            "name": {"type": "string"},
            "age": {"type": "number"}
        },
        "required": ["name"]
    }))
    .await;

    let output = schema
        .validate(&ctx, &json!({"name": "Alice", "age": 30}))
        .unwrap();
    assert!(output.valid);

    let output = schema.validate(&ctx, &json!({"age": 30})).unwrap();
    assert!(!output.valid);
    assert_eq!(output.errors.len(), 1);
    assert_eq!(output.errors[0].keyword_location, "/required");
}

#[tokio::test]
async fn test_email_format_in_known_mode() {
    let (ctx, schema) = parsed_with_mode(
        json!({"type": "string", "format": "email"}),
        ValidationMode::Known,
    )
    .await;

    assert!(schema.is_valid(&ctx, &json!("user@example.com")).unwrap());
    assert!(!schema.is_valid(&ctx, &json!("invalid-email")).unwrap());
}

#[tokio::test]
async fn test_recursive_ref() {
    let (ctx, schema) = parsed(json!({
        "$id": "https://example.com/tree",
        "type": "object",
        "properties": {
            "value": {"type": "integer"},
            "children": {"type": "array", "items": {"$ref": "#"}}
        }
    }))
    .await;

    let instance = json!({
        "value": 1,
        "children": [
            {"value": 2, "children": [
                {"value": 3, "children": []}
            ]}
        ]
    });
    assert!(schema.is_valid(&ctx, &instance).unwrap());

    let bad = json!({"value": 1, "children": [{"value": "two", "children": []}]});
    assert!(!schema.is_valid(&ctx, &bad).unwrap());
}

#[tokio::test]
async fn test_dynamic_ref_resolves_to_outermost_anchor() {
    let mut ctx = Context::new();
    let tree = ctx
        .parse(json!({
            "$id": "https://example.com/tree",
            "$dynamicAnchor": "node",
            "properties": {
                "children": {"type": "array", "items": {"$dynamicRef": "#node"}}
            }
        }))
        .await
        .unwrap();
    let strict = ctx
        .parse(json!({
            "$id": "https://example.com/strict",
            "$dynamicAnchor": "node",
            "$ref": "https://example.com/tree",
            "unevaluatedProperties": false
        }))
        .await
        .unwrap();

    let instance = json!({"children": [{"typo": 1}]});
    assert!(tree.is_valid(&ctx, &instance).unwrap());
    assert!(!strict.is_valid(&ctx, &instance).unwrap());
}

#[tokio::test]
async fn test_unevaluated_properties_across_all_of() {
    let (ctx, schema) = parsed(json!({
        "allOf": [{"properties": {"name": {"type": "string"}}}],
        "unevaluatedProperties": {"type": "number"}
    }))
    .await;

    assert!(schema.is_valid(&ctx, &json!({"name": "x", "age": 30})).unwrap());

    let output = schema
        .validate(&ctx, &json!({"name": "x", "age": "30"}))
        .unwrap();
    assert!(!output.valid);
    assert!(output
        .flattened()
        .iter()
        .any(|row| row.keyword_location.starts_with("/unevaluatedProperties")));
}

// ---------------------------------------------------------------------------
// Universal properties

#[tokio::test]
async fn test_boolean_schemas() {
    let instances = [
        json!(null),
        json!(true),
        json!(42),
        json!("text"),
        json!([1, 2]),
        json!({"a": 1}),
    ];
    let (ctx, accept) = parsed(json!(true)).await;
    for instance in &instances {
        assert!(accept.is_valid(&ctx, instance).unwrap());
    }
    let (ctx, reject) = parsed(json!(false)).await;
    for instance in &instances {
        assert!(!reject.is_valid(&ctx, instance).unwrap());
    }
}

#[tokio::test]
async fn test_unknown_keywords_annotate_and_never_fail() {
    let (ctx, schema) = parsed(json!({
        "type": "object",
        "x-internal-routing": {"shard": 12}
    }))
    .await;

    let output = schema.validate(&ctx, &json!({})).unwrap();
    assert!(output.valid);
    let unknown = output
        .annotations
        .iter()
        .find(|a| a.keyword_location == "/x-internal-routing")
        .expect("unknown keyword appears as annotation");
    assert_eq!(unknown.annotation, Some(json!({"shard": 12})));
}

#[tokio::test]
async fn test_reference_transparency() {
    let (ctx, by_ref) = parsed(json!({
        "$ref": "#/$defs/limits",
        "$defs": {"limits": {"type": "integer", "minimum": 3}}
    }))
    .await;
    let (direct_ctx, direct) = parsed(json!({"type": "integer", "minimum": 3})).await;

    for instance in [json!(2), json!(3), json!(10), json!("3"), json!(null)] {
        assert_eq!(
            by_ref.is_valid(&ctx, &instance).unwrap(),
            direct.is_valid(&direct_ctx, &instance).unwrap(),
            "mismatch for {instance}"
        );
    }
}

#[tokio::test]
async fn test_key_order_does_not_change_outcomes() {
    let forward = json!({
        "type": "object",
        "properties": {"a": {"type": "string"}},
        "additionalProperties": {"type": "integer"},
        "required": ["a"]
    });
    let reversed = json!({
        "required": ["a"],
        "additionalProperties": {"type": "integer"},
        "properties": {"a": {"type": "string"}},
        "type": "object"
    });

    let (ctx_a, schema_a) = parsed(forward).await;
    let (ctx_b, schema_b) = parsed(reversed).await;

    for instance in [
        json!({"a": "x", "b": 1}),
        json!({"a": "x", "b": "y"}),
        json!({"b": 1}),
        json!({"a": 5}),
        json!(7),
    ] {
        let out_a = schema_a.validate(&ctx_a, &instance).unwrap();
        let out_b = schema_b.validate(&ctx_b, &instance).unwrap();
        assert_eq!(out_a.valid, out_b.valid, "validity differs for {instance}");

        let rows = |out: &jsonschema_engine::OutputUnit| {
            let mut rows: Vec<(String, String)> = out
                .flattened()
                .into_iter()
                .map(|r| (r.keyword_location, r.instance_location))
                .collect();
            rows.sort();
            rows
        };
        assert_eq!(rows(&out_a), rows(&out_b), "error shape differs for {instance}");
    }
}

#[tokio::test]
async fn test_unevaluated_never_revisits_covered_locations() {
    // Everything reachable through properties, patternProperties, or a
    // matching conditional is off limits for unevaluatedProperties.
    let (ctx, schema) = parsed(json!({
        "properties": {"a": true},
        "patternProperties": {"^b": true},
        "if": {"required": ["a"]},
        "then": {"properties": {"c": true}},
        "unevaluatedProperties": false
    }))
    .await;

    assert!(schema
        .is_valid(&ctx, &json!({"a": 1, "b1": 2, "c": 3}))
        .unwrap());
    assert!(!schema
        .is_valid(&ctx, &json!({"a": 1, "d": 4}))
        .unwrap());
}

// ---------------------------------------------------------------------------
// Applicators

#[tokio::test]
async fn test_one_of_requires_exactly_one_match() {
    let (ctx, schema) = parsed(json!({
        "oneOf": [
            {"type": "integer"},
            {"minimum": 2}
        ]
    }))
    .await;

    assert!(schema.is_valid(&ctx, &json!(1)).unwrap()); // integer only
    assert!(schema.is_valid(&ctx, &json!(2.5)).unwrap()); // minimum only
    assert!(!schema.is_valid(&ctx, &json!(3)).unwrap()); // both
    assert!(!schema.is_valid(&ctx, &json!(0.5)).unwrap()); // neither
}

#[tokio::test]
async fn test_any_of_collects_branch_errors_on_total_failure() {
    let (ctx, schema) = parsed(json!({
        "anyOf": [{"type": "string"}, {"type": "integer"}]
    }))
    .await;

    assert!(schema.is_valid(&ctx, &json!("x")).unwrap());
    assert!(schema.is_valid(&ctx, &json!(3)).unwrap());

    let output = schema.validate(&ctx, &json!(3.5)).unwrap();
    assert!(!output.valid);
    assert!(!output.errors.is_empty());
}

#[tokio::test]
async fn test_not_inverts_and_discards_speculation() {
    let (ctx, schema) = parsed(json!({"not": {"type": "string"}})).await;
    let output = schema.validate(&ctx, &json!(5)).unwrap();
    assert!(output.valid);
    assert!(output.errors.is_empty());
    assert!(!schema.is_valid(&ctx, &json!("text")).unwrap());
}

#[tokio::test]
async fn test_if_then_else() {
    let (ctx, schema) = parsed(json!({
        "if": {"properties": {"kind": {"const": "user"}}, "required": ["kind"]},
        "then": {"required": ["email"]},
        "else": {"required": ["token"]}
    }))
    .await;

    assert!(schema
        .is_valid(&ctx, &json!({"kind": "user", "email": "a@b.c"}))
        .unwrap());
    assert!(!schema.is_valid(&ctx, &json!({"kind": "user"})).unwrap());
    assert!(schema
        .is_valid(&ctx, &json!({"kind": "service", "token": "t"}))
        .unwrap());
    assert!(!schema.is_valid(&ctx, &json!({"kind": "service"})).unwrap());
}

#[tokio::test]
async fn test_contains_with_bounds() {
    let (ctx, schema) = parsed(json!({
        "contains": {"type": "integer"},
        "minContains": 2,
        "maxContains": 3
    }))
    .await;

    assert!(!schema.is_valid(&ctx, &json!(["a", 1])).unwrap());
    assert!(schema.is_valid(&ctx, &json!(["a", 1, 2])).unwrap());
    assert!(schema.is_valid(&ctx, &json!([1, 2, 3])).unwrap());
    assert!(!schema.is_valid(&ctx, &json!([1, 2, 3, 4])).unwrap());
}

#[tokio::test]
async fn test_min_contains_zero_accepts_no_matches() {
    let (ctx, schema) = parsed(json!({
        "contains": {"type": "integer"},
        "minContains": 0
    }))
    .await;
    assert!(schema.is_valid(&ctx, &json!(["a", "b"])).unwrap());
}

#[tokio::test]
async fn test_prefix_items_and_items() {
    let (ctx, schema) = parsed(json!({
        "prefixItems": [{"type": "string"}, {"type": "integer"}],
        "items": {"type": "boolean"}
    }))
    .await;

    assert!(schema.is_valid(&ctx, &json!(["a", 1, true, false])).unwrap());
    assert!(schema.is_valid(&ctx, &json!(["a"])).unwrap());
    assert!(!schema.is_valid(&ctx, &json!([1])).unwrap());
    assert!(!schema.is_valid(&ctx, &json!(["a", 1, "no"])).unwrap());
}

#[tokio::test]
async fn test_unevaluated_items_after_prefix() {
    let (ctx, schema) = parsed(json!({
        "allOf": [{"prefixItems": [{"type": "string"}]}],
        "unevaluatedItems": {"type": "integer"}
    }))
    .await;

    assert!(schema.is_valid(&ctx, &json!(["a", 1, 2])).unwrap());
    assert!(!schema.is_valid(&ctx, &json!(["a", "b"])).unwrap());
}

#[tokio::test]
async fn test_property_names() {
    let (ctx, schema) = parsed(json!({"propertyNames": {"maxLength": 3}})).await;
    assert!(schema.is_valid(&ctx, &json!({"abc": 1, "x": 2})).unwrap());
    assert!(!schema.is_valid(&ctx, &json!({"toolong": 1})).unwrap());
}

#[tokio::test]
async fn test_dependent_schemas_and_required() {
    let (ctx, schema) = parsed(json!({
        "dependentSchemas": {
            "credit_card": {"required": ["billing_address"]}
        },
        "dependentRequired": {
            "shipping": ["address"]
        }
    }))
    .await;

    assert!(schema.is_valid(&ctx, &json!({"name": "x"})).unwrap());
    assert!(!schema.is_valid(&ctx, &json!({"credit_card": "4111"})).unwrap());
    assert!(schema
        .is_valid(&ctx, &json!({"credit_card": "4111", "billing_address": "a"}))
        .unwrap());
    assert!(!schema.is_valid(&ctx, &json!({"shipping": true})).unwrap());
}

#[tokio::test]
async fn test_pattern_properties_and_additional_properties() {
    let (ctx, schema) = parsed(json!({
        "properties": {"name": {"type": "string"}},
        "patternProperties": {"^x-": true},
        "additionalProperties": false
    }))
    .await;

    assert!(schema
        .is_valid(&ctx, &json!({"name": "a", "x-meta": [1]}))
        .unwrap());
    assert!(!schema.is_valid(&ctx, &json!({"other": 1})).unwrap());
}

// ---------------------------------------------------------------------------
// Validation keywords

#[tokio::test]
async fn test_numeric_bounds_and_multiples() {
    let (ctx, schema) = parsed(json!({
        "minimum": 0,
        "exclusiveMaximum": 100,
        "multipleOf": 0.5
    }))
    .await;

    assert!(schema.is_valid(&ctx, &json!(0)).unwrap());
    assert!(schema.is_valid(&ctx, &json!(99.5)).unwrap());
    assert!(!schema.is_valid(&ctx, &json!(100)).unwrap());
    assert!(!schema.is_valid(&ctx, &json!(-1)).unwrap());
    assert!(!schema.is_valid(&ctx, &json!(0.25)).unwrap());
    assert!(schema.is_valid(&ctx, &json!("not a number")).unwrap());
}

#[tokio::test]
async fn test_string_lengths_count_code_points() {
    let (ctx, schema) = parsed(json!({"minLength": 2, "maxLength": 3})).await;
    assert!(schema.is_valid(&ctx, &json!("日本")).unwrap());
    assert!(schema.is_valid(&ctx, &json!("日本語")).unwrap());
    assert!(!schema.is_valid(&ctx, &json!("日")).unwrap());
    assert!(!schema.is_valid(&ctx, &json!("abcd")).unwrap());
}

#[tokio::test]
async fn test_enum_and_const_use_deep_equality() {
    let (ctx, schema) = parsed(json!({"enum": [[1, 2], {"a": 1.0}]})).await;
    assert!(schema.is_valid(&ctx, &json!([1, 2])).unwrap());
    assert!(schema.is_valid(&ctx, &json!({"a": 1})).unwrap());
    assert!(!schema.is_valid(&ctx, &json!([2, 1])).unwrap());

    let (ctx, schema) = parsed(json!({"const": 1})).await;
    assert!(schema.is_valid(&ctx, &json!(1.0)).unwrap());
    assert!(!schema.is_valid(&ctx, &json!(2)).unwrap());
}

#[tokio::test]
async fn test_unique_items() {
    let (ctx, schema) = parsed(json!({"uniqueItems": true})).await;
    assert!(schema.is_valid(&ctx, &json!([1, 2, "1"])).unwrap());
    assert!(!schema.is_valid(&ctx, &json!([1, 2, 1.0])).unwrap());
    assert!(!schema.is_valid(&ctx, &json!([{"a": 1}, {"a": 1}])).unwrap());
}

#[tokio::test]
async fn test_strict_mode_rejects_unknown_formats() {
    let schema = json!({"format": "no-such-format"});
    let (ctx, parsed_schema) = parsed_with_mode(schema.clone(), ValidationMode::Known).await;
    assert!(parsed_schema.is_valid(&ctx, &json!("anything")).unwrap());

    let (ctx, parsed_schema) = parsed_with_mode(schema, ValidationMode::Strict).await;
    assert!(!parsed_schema.is_valid(&ctx, &json!("anything")).unwrap());
}

#[tokio::test]
async fn test_format_only_annotates_by_default() {
    let (ctx, schema) = parsed(json!({"format": "email"})).await;
    let output = schema.validate(&ctx, &json!("not-an-email")).unwrap();
    assert!(output.valid);
    assert!(output
        .annotations
        .iter()
        .any(|a| a.keyword_location == "/format" && a.annotation == Some(json!("email"))));
}

// ---------------------------------------------------------------------------
// Older dialects

#[tokio::test]
async fn test_draft07_array_items_and_additional_items() {
    let (ctx, schema) = parsed(json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "items": [{"type": "string"}, {"type": "integer"}],
        "additionalItems": {"type": "boolean"}
    }))
    .await;

    assert!(schema.is_valid(&ctx, &json!(["a", 1, true])).unwrap());
    assert!(!schema.is_valid(&ctx, &json!(["a", 1, "no"])).unwrap());
    assert!(!schema.is_valid(&ctx, &json!([1])).unwrap());
}

#[tokio::test]
async fn test_draft07_dependencies_both_forms() {
    let (ctx, schema) = parsed(json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "dependencies": {
            "a": ["b"],
            "c": {"required": ["d"]}
        }
    }))
    .await;

    assert!(schema.is_valid(&ctx, &json!({})).unwrap());
    assert!(!schema.is_valid(&ctx, &json!({"a": 1})).unwrap());
    assert!(schema.is_valid(&ctx, &json!({"a": 1, "b": 2})).unwrap());
    assert!(!schema.is_valid(&ctx, &json!({"c": 1})).unwrap());
    assert!(schema.is_valid(&ctx, &json!({"c": 1, "d": 2})).unwrap());
}

#[tokio::test]
async fn test_draft04_boolean_exclusive_bounds() {
    let (ctx, schema) = parsed(json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "maximum": 10,
        "exclusiveMaximum": true,
        "minimum": 0
    }))
    .await;

    assert!(schema.is_valid(&ctx, &json!(9.9)).unwrap());
    assert!(!schema.is_valid(&ctx, &json!(10)).unwrap());
    assert!(schema.is_valid(&ctx, &json!(0)).unwrap());
}

#[tokio::test]
async fn test_openapi_dialect_treats_extensions_as_annotations() {
    let (ctx, schema) = parsed(json!({
        "$schema": "https://spec.openapis.org/oas/3.1/dialect/base",
        "type": "object",
        "discriminator": {"propertyName": "kind"},
        "example": {"kind": "cat"}
    }))
    .await;

    let output = schema.validate(&ctx, &json!({"kind": "cat"})).unwrap();
    assert!(output.valid);
    assert!(output
        .annotations
        .iter()
        .any(|a| a.keyword_location == "/discriminator"));
}

// ---------------------------------------------------------------------------
// Output shape

#[tokio::test]
async fn test_output_locations_follow_dynamic_path() {
    let (ctx, schema) = parsed(json!({
        "$id": "https://example.com/person",
        "properties": {
            "pet": {"$ref": "#/$defs/pet"}
        },
        "$defs": {
            "pet": {"properties": {"age": {"type": "integer"}}}
        }
    }))
    .await;

    let output = schema
        .validate(&ctx, &json!({"pet": {"age": "old"}}))
        .unwrap();
    assert!(!output.valid);
    let rows = output.flattened();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].keyword_location,
        "/properties/pet/$ref/properties/age/type"
    );
    assert_eq!(rows[0].instance_location, "/pet/age");
}

#[tokio::test]
async fn test_absolute_keyword_location_crosses_resources() {
    let (ctx, schema) = parsed(json!({
        "$id": "https://example.com/person",
        "properties": {
            "age": {"type": "integer"}
        }
    }))
    .await;

    let output = schema.validate(&ctx, &json!({"age": "old"})).unwrap();
    let rows = output.flattened();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].keyword_location, "/properties/age/type");
    // The `properties` unit carries its own annotation, so the type error
    // stays nested one level beneath it.
    let error_unit = &output.errors[0].errors[0];
    assert_eq!(
        error_unit.absolute_keyword_location.as_deref(),
        Some("https://example.com/person#/properties/age/type")
    );
}

#[tokio::test]
async fn test_anchor_references() {
    let (ctx, schema) = parsed(json!({
        "$id": "https://example.com/root",
        "$ref": "#positive",
        "$defs": {
            "positive": {"$anchor": "positive", "type": "number", "exclusiveMinimum": 0}
        }
    }))
    .await;

    assert!(schema.is_valid(&ctx, &json!(3)).unwrap());
    assert!(!schema.is_valid(&ctx, &json!(-3)).unwrap());
}

#[tokio::test]
async fn test_dynamic_ref_without_dynamic_anchor_behaves_statically() {
    let (ctx, schema) = parsed(json!({
        "$id": "https://example.com/static-fallback",
        "$dynamicRef": "#target",
        "$defs": {
            "target": {"$anchor": "target", "type": "integer"}
        }
    }))
    .await;

    assert!(schema.is_valid(&ctx, &json!(5)).unwrap());
    assert!(!schema.is_valid(&ctx, &json!("five")).unwrap());
}
