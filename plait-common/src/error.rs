use std::sync::Arc;

use thiserror::Error;

use crate::model::tags::TagSet;
use crate::model::token::TypeToken;

#[derive(Error, Debug, Clone)]
pub enum PlaitError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Manifest Error: {0}")]
    Manifest(String),

    #[error("Type Parse Error: cannot parse '{text}': {reason}")]
    TokenParse { text: String, reason: String },

    #[error("Unresolved type for parameter '{parameter}' of {owner_source}")]
    UnresolvedType { owner_source: String, parameter: String },

    #[error("Unresolvable dependency: no candidate produces {requested} with tags {tags} (required by {requester})")]
    Unresolvable {
        requested: TypeToken,
        tags: TagSet,
        requester: String,
    },

    #[error("Ambiguous dependency: {requested} with tags {tags} has multiple equally valid candidates and no single default: {candidates:?} (required by {requester})")]
    Ambiguous {
        requested: TypeToken,
        tags: TagSet,
        candidates: Vec<String>,
        requester: String,
    },

    #[error("Cyclic template specialization while synthesizing {requested}")]
    CyclicTemplate { requested: TypeToken },

    #[error("Resolution Error: {0}")]
    Resolution(String),
}

impl From<std::io::Error> for PlaitError {
    fn from(err: std::io::Error) -> Self {
        PlaitError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for PlaitError {
    fn from(err: serde_json::Error) -> Self {
        PlaitError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, PlaitError>;
