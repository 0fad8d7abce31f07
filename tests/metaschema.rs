//! Dialect roundtrip tests
//!
//! Each standard dialect's meta-schema document must parse under this engine
//! and validate itself. External `$ref`s between the meta-schema documents
//! are served offline by the directory loader from the fixture set.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use jsonschema_engine::{Context, ContextOptions, DirectoryLoader};

fn fixtures() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/metaschemas")
}

fn load(name: &str) -> Value {
    let path = fixtures().join(name);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("reading {}: {e}", path.display()));
    serde_json::from_str(&content).expect("fixture is valid JSON")
}

fn loader_context() -> Context {
    let loader = DirectoryLoader::new(fixtures()).expect("fixture directory scans");
    Context::with_options(ContextOptions::default().with_loader(Arc::new(loader)))
}

async fn assert_self_describing(file: &str) {
    let document = load(file);
    let mut ctx = loader_context();
    let schema = ctx
        .parse(document.clone())
        .await
        .unwrap_or_else(|e| panic!("{file} fails to parse: {e}"));
    let output = schema
        .validate(&ctx, &document)
        .unwrap_or_else(|e| panic!("{file} fails to evaluate: {e}"));
    assert!(
        output.valid,
        "{file} does not validate itself: {:#?}",
        output.flattened()
    );
}

#[tokio::test]
async fn test_2020_12_meta_schema_validates_itself() {
    assert_self_describing("draft2020-12-schema.json").await;
}

#[tokio::test]
async fn test_draft_07_meta_schema_validates_itself() {
    assert_self_describing("draft-07.json").await;
}

#[tokio::test]
async fn test_draft_04_meta_schema_validates_itself() {
    assert_self_describing("draft-04.json").await;
}

#[tokio::test]
async fn test_openapi_dialect_meta_schema_validates_itself() {
    assert_self_describing("oas-3.1-dialect.json").await;
}

#[tokio::test]
async fn test_2020_12_vocabulary_metas_validate_themselves() {
    for file in [
        "draft2020-12-core.json",
        "draft2020-12-applicator.json",
        "draft2020-12-unevaluated.json",
        "draft2020-12-validation.json",
        "draft2020-12-meta-data.json",
        "draft2020-12-format-annotation.json",
        "draft2020-12-content.json",
    ] {
        assert_self_describing(file).await;
    }
}

#[tokio::test]
async fn test_dialect_registration_from_meta_schema_fixture() {
    let mut ctx = loader_context();
    let uri = ctx
        .parse_dialect(load("draft2020-12-schema.json"))
        .await
        .expect("meta-schema registers as a dialect");
    assert_eq!(uri.as_str(), "https://json-schema.org/draft/2020-12/schema");
}

#[tokio::test]
async fn test_schema_using_remote_meta_ref_loads_offline() {
    // A schema referencing into a meta-schema resource pulls the document
    // through the loader and resolves the pointer fragment inside it.
    let mut ctx = loader_context();
    let schema = ctx
        .parse(serde_json::json!({
            "$ref": "https://json-schema.org/draft/2020-12/meta/validation#/$defs/nonNegativeInteger"
        }))
        .await
        .unwrap();
    assert!(schema.is_valid(&ctx, &serde_json::json!(3)).unwrap());
    assert!(!schema.is_valid(&ctx, &serde_json::json!(-3)).unwrap());
    assert!(!schema.is_valid(&ctx, &serde_json::json!(2.5)).unwrap());
}
