//! Error types for schema parsing and evaluation

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema engine errors
///
/// Parse errors fail the parse immediately; instance validation problems are
/// reported through the output tree instead and never surface here.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("schema at {location} is not a boolean or object")]
    SchemaNotObject { location: String },

    #[error("unknown dialect: {uri}")]
    UnknownDialect { uri: String },

    #[error("invalid value for keyword {keyword:?} at {location}: {reason}")]
    InvalidKeywordValue {
        keyword: String,
        location: String,
        reason: String,
    },

    #[error("invalid URI {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("{keyword} at {location} must not carry a fragment: {uri:?}")]
    IdWithFragment {
        keyword: String,
        location: String,
        uri: String,
    },

    #[error("invalid anchor name {name:?} at {location}")]
    InvalidAnchor { name: String, location: String },

    #[error("keyword dependency cycle among: {}", keys.join(", "))]
    CycleDetected { keys: Vec<String> },

    #[error("invalid regular expression {pattern:?}: {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("unresolved reference: {uri}")]
    Unresolved { uri: String },

    #[error("required vocabulary is not known: {uri}")]
    UnknownVocabulary { uri: String },

    #[error("meta-schema has no $vocabulary object")]
    NotAMetaSchema,

    #[error("schema node was not parsed by this context")]
    UninitializedSchema,

    #[error("reference loader failed for {uri}: {message}")]
    Loader { uri: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
