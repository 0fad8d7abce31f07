//! Reference loading
//!
//! Resolving a `$ref` may require fetching a resource the context has never
//! seen. That fetch is the single suspension point of the parse pipeline,
//! expressed as an async trait so hosts can plug in whatever I/O they have.
//! Validation never loads anything.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;
use walkdir::WalkDir;

use crate::error::{Result, SchemaError};

/// Host hook for fetching external schema resources by absolute URI.
#[async_trait]
pub trait ReferenceLoader: Send + Sync {
    async fn load(&self, uri: &Url) -> Result<Value>;
}

/// The default loader: refuses every fetch. References into resources the
/// context has not parsed fail resolution with `Unresolved`.
#[derive(Debug, Default)]
pub struct NoLoader;

#[async_trait]
impl ReferenceLoader for NoLoader {
    async fn load(&self, uri: &Url) -> Result<Value> {
        Err(SchemaError::Loader {
            uri: uri.to_string(),
            message: "no reference loader configured".to_string(),
        })
    }
}

/// Serves fetches from a directory of `*.json` schema documents, indexed by
/// the `$id` (or legacy `id`) declared at each document root. Everything is
/// scanned up front so lookups are just an index hit plus one file read.
#[derive(Debug)]
pub struct DirectoryLoader {
    index: HashMap<Url, PathBuf>,
}

impl DirectoryLoader {
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let mut index = HashMap::new();
        for entry in WalkDir::new(root.as_ref()).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() || path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            let content = std::fs::read_to_string(path)?;
            let Ok(document) = serde_json::from_str::<Value>(&content) else {
                continue;
            };
            let id = document
                .get("$id")
                .or_else(|| document.get("id"))
                .and_then(Value::as_str);
            if let Some(id) = id {
                if let Ok(mut uri) = Url::parse(id) {
                    uri.set_fragment(None);
                    debug!(uri = %uri, path = %path.display(), "indexed schema document");
                    index.insert(uri, path.to_path_buf());
                }
            }
        }
        Ok(Self { index })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[async_trait]
impl ReferenceLoader for DirectoryLoader {
    async fn load(&self, uri: &Url) -> Result<Value> {
        let path = self.index.get(uri).ok_or_else(|| SchemaError::Loader {
            uri: uri.to_string(),
            message: "no indexed document with this $id".to_string(),
        })?;
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::Loader {
            uri: uri.to_string(),
            message: e.to_string(),
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}
