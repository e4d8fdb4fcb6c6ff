//! Search error types for kat-search.

/// Errors from the resource index.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Transport failure talking to the index service.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The index service answered with a non-success status.
    #[error("index API error ({status}, {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Response body did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// Invalid or empty search query.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Search client construction failed.
    #[error("client setup: {0}")]
    Setup(String),

    /// Failure injected by the in-memory index.
    #[error("injected failure: {0}")]
    Injected(String),
}

impl SearchError {
    /// Meilisearch error code, when the service supplied one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } if !code.is_empty() => Some(code),
            _ => None,
        }
    }
}
