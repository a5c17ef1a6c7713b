//! Error types for ranged retrieval.

use thiserror::Error;

/// Errors produced by an [`HttpClient`](crate::HttpClient) backend.
#[derive(Debug, Error)]
pub enum HttpClientError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Any other backend failure.
    #[error("http client error: {0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Errors produced by ranged-retrieval operations.
///
/// `Clone` because a block fetch outcome fans out to every joiner of the
/// in-flight fetch; transport causes are carried as strings for that reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// The server answered with something other than 206 Partial Content,
    /// i.e. it does not support (or refused) ranged retrieval.
    #[error("expected 206 Partial Content, got {0}")]
    UnexpectedStatus(u16),

    /// A partial-content response arrived without a `Content-Range` header.
    #[error("Content-Range header not found")]
    MissingContentRange,

    /// The `Content-Range` header could not be parsed.
    #[error("failed to parse Content-Range header: {0}")]
    MalformedContentRange(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection-level or other transport failure.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<HttpClientError> for RangeError {
    fn from(e: HttpClientError) -> Self {
        match e {
            HttpClientError::Timeout => Self::Timeout,
            HttpClientError::Connection(msg) => Self::Transport(msg),
            HttpClientError::Other(inner) => Self::Transport(inner.to_string()),
        }
    }
}
