//! Warehouse provider error types.

use thiserror::Error;

/// Whether a failed call is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network trouble, timeouts, throttling, server errors.
    Transient,
    /// Bad credentials, permission denial, missing resources, malformed payloads.
    Fatal,
}

/// Errors that can occur while reading a remote catalog.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider API returned a non-success status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Error message or response body.
        message: String,
    },

    /// The provider returned a 429 Too Many Requests response.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Credential could not be turned into an access token.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Failed to parse a provider response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Failure raised by [`crate::memory::InMemoryCatalog`].
    #[error("injected {kind:?} failure: {message}")]
    Injected { kind: ErrorKind, message: String },
}

impl ProviderError {
    /// Classify the error for retry decisions.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                ErrorKind::Transient
            }
            Self::Api { status, .. } if *status == 408 || *status >= 500 => ErrorKind::Transient,
            Self::RateLimited { .. } => ErrorKind::Transient,
            Self::Injected { kind, .. } => *kind,
            Self::Http(_) | Self::Api { .. } | Self::Auth(_) | Self::Parse(_) => ErrorKind::Fatal,
        }
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl From<jsonwebtoken::errors::Error> for ProviderError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Self::Auth(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(500, ErrorKind::Transient)]
    #[case(503, ErrorKind::Transient)]
    #[case(408, ErrorKind::Transient)]
    #[case(400, ErrorKind::Fatal)]
    #[case(401, ErrorKind::Fatal)]
    #[case(403, ErrorKind::Fatal)]
    #[case(404, ErrorKind::Fatal)]
    fn api_status_classification(#[case] status: u16, #[case] expected: ErrorKind) {
        let err = ProviderError::Api {
            status,
            message: String::new(),
        };
        assert_eq!(err.kind(), expected);
    }

    #[test]
    fn rate_limit_is_transient() {
        assert!(ProviderError::RateLimited { retry_after_secs: 1 }.is_transient());
    }

    #[test]
    fn auth_and_parse_are_fatal() {
        assert_eq!(ProviderError::Auth("bad key".into()).kind(), ErrorKind::Fatal);
        assert_eq!(ProviderError::Parse("eof".into()).kind(), ErrorKind::Fatal);
    }

    #[test]
    fn injected_keeps_its_kind() {
        let err = ProviderError::Injected {
            kind: ErrorKind::Transient,
            message: "flaky".into(),
        };
        assert!(err.is_transient());
    }
}
