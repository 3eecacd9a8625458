//! The configuration document: a path-addressed tree plus a scoped variable environment

mod env;
mod store;
mod xml;

pub use env::Env;
pub use store::{join_path, parent_path, Config, ConfigValue, View};
pub(crate) use xml::escape_xml;

use thiserror::Error;

/// Errors that can occur when loading or saving a configuration document
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("Failed to access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
