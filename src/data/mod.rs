//! Data sources: object containers and tabular record files

mod container;
mod record;
mod tabular;

pub use container::DataFile;
pub use record::{ContainerFile, ObjectRecord};
pub use tabular::{TabularSource, DEFAULT_SPLIT_BY};

use thiserror::Error;

use crate::objects::HistogramError;
use crate::parser::EvalError;

/// Errors raised while loading or querying a data source
#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Histogram(#[from] HistogramError),

    #[error("invalid expression `{expr}`:\n{message}")]
    Expression { expr: String, message: String },

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("object {name} has unsupported type {kind}")]
    UnknownType { name: String, kind: String },

    #[error("tree {tree} not found in {path}")]
    MissingTree { tree: String, path: String },

    #[error("draw expression has {0} dimensions, expected 1 to 3")]
    Dimension(usize),
}
