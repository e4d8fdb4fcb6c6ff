//! Cross-cutting error types for Katalog.
//!
//! Domain-specific errors (`DatabaseError`, `ProviderError`, `SearchError`,
//! ...) live in their respective crates. `kat-cli` converges all of them
//! into `anyhow`.

use thiserror::Error;

/// Errors that can be raised by any Katalog crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// A change record was constructed with fields that contradict its type.
    #[error("Invalid change record: {0}")]
    InvalidChange(String),

    /// Data failed validation (format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A field value could not be JSON-encoded.
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
