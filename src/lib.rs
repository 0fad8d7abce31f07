//! JSON Schema Engine
//!
//! A multi-dialect JSON Schema parser and validator: schemas are parsed
//! into dependency-ordered keyword programs indexed by a resource registry,
//! then instances are evaluated against them producing a structured output
//! tree of errors and annotations.
//!
//! ## Features
//!
//! - **Multi-dialect**: 2020-12, Draft 7, Draft 4, and the OpenAPI 3.1 base
//!   dialect built in; further dialects via `$vocabulary` meta-schemas
//! - **Full reference machinery**: `$id` base-URI scoping, `$anchor`,
//!   `$dynamicRef`/`$dynamicAnchor` dynamic-scope lookup, async loading of
//!   external resources
//! - **Annotation-driven evaluation**: `unevaluatedItems` and
//!   `unevaluatedProperties` aggregate annotations across the dynamic scope
//! - **Structured output**: a tree of output units with keyword, absolute,
//!   and instance locations
//!
//! ## Example
//!
//! ```no_run
//! # async fn example() -> jsonschema_engine::Result<()> {
//! use jsonschema_engine::Context;
//! use serde_json::json;
//!
//! let mut ctx = Context::new();
//! let schema = ctx
//!     .parse(json!({
//!         "type": "object",
//!         "properties": {"name": {"type": "string"}},
//!         "required": ["name"]
//!     }))
//!     .await?;
//!
//! let output = schema.validate(&ctx, &json!({"name": "Alice"}))?;
//! assert!(output.valid);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! parse:    document --> dialect dispatch --> keyword program (sorted)
//!                    --> per-keyword parse --> resources / anchors / refs
//!                    --> reference resolution (async, loader)
//! validate: schema x instance --> frame stack --> keyword validates
//!                              --> output tree (errors + annotations)
//! ```

pub mod context;
pub mod dialect;
pub mod error;
pub mod format;
pub mod keyword;
pub mod keywords;
pub mod loader;
pub mod output;
pub mod parser;
pub mod registry;
pub mod validator;
pub mod value;

pub use context::{Context, ContextOptions, NodeId, ValidationMode};
pub use dialect::Dialect;
pub use error::{Result, SchemaError};
pub use format::Format;
pub use keyword::Keyword;
pub use loader::{DirectoryLoader, NoLoader, ReferenceLoader};
pub use output::{FlatError, OutputUnit};
pub use registry::RefKind;
pub use validator::Schema;
