//! Error types for the search pipeline

use thiserror::Error;

/// Errors surfaced by the search pipeline
#[derive(Debug, Error)]
pub enum SearchError {
    /// Bad user input (empty query, out-of-range count)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Index or embedding provider unreachable or erroring
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// A single hit could not be converted into a book record
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// A newer request in the same session replaced this one
    #[error("Search superseded by a newer request")]
    Superseded,

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dataset could not be read
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::RetrievalUnavailable(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    /// Whether the caller may retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RetrievalUnavailable(_))
    }
}

impl From<crate::search::embedding::EmbeddingError> for SearchError {
    fn from(e: crate::search::embedding::EmbeddingError) -> Self {
        Self::RetrievalUnavailable(e.to_string())
    }
}

impl From<crate::search::index::IndexError> for SearchError {
    fn from(e: crate::search::index::IndexError) -> Self {
        Self::RetrievalUnavailable(e.to_string())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_retrieval_failures_are_retryable() {
        assert!(SearchError::unavailable("down").is_retryable());
        assert!(!SearchError::invalid_request("empty").is_retryable());
        assert!(!SearchError::malformed("price").is_retryable());
        assert!(!SearchError::Superseded.is_retryable());
    }

    #[test]
    fn test_index_error_maps_to_unavailable() {
        let err: SearchError = crate::search::index::IndexError::Closed.into();
        assert!(matches!(err, SearchError::RetrievalUnavailable(_)));
    }
}
