//! Error types for catalog loading.

use thiserror::Error;

/// Errors raised while locating or parsing the service catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no catalog found (tried: {0})")]
    NotFound(String),

    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}
