//! Catalog loading error types.

use std::path::PathBuf;

/// Errors that can occur while loading the cafe catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog file could not be read
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is neither a keyed object nor an array of records
    #[error("unsupported catalog layout: expected an object or an array")]
    Layout,
}
