//! Unified error handling for the gleaner crate
//!
//! Per-source and per-item failures are handled where they occur and never
//! abort a run; this unified type is what crosses module boundaries when a
//! failure must stop a stage (missing credentials, invariant violations,
//! storage corruption).

use std::io;
use thiserror::Error;

pub use crate::utils::error::{FeedError, FetchError, LlmError};

/// Unified error type for the gleaner crate
#[derive(Error, Debug)]
pub enum Error {
    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Feed resolution and parsing errors
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// LLM provider and summary validation errors
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Template rendering errors
    #[error("Render error: {0}")]
    Render(#[from] handlebars::RenderError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// State-transition bug, e.g. re-summarizing a summarized item
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invariant-violation error
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Check if this error is recoverable (scoped to one source/item)
    ///
    /// Recoverable errors are logged and the run continues; the rest
    /// abort the current stage. Note this is batch scoping, not request
    /// retryability: a definitive 404 still only affects its own source.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(_) => true,
            Self::Feed(_) => true,
            Self::Llm(LlmError::Auth) | Self::Llm(LlmError::NoCredentials) => false,
            Self::Llm(_) => true,
            Self::Database(_) | Self::Io(_) => false,
            Self::Json(_) | Self::Render(_) => false,
            Self::Config(_) | Self::InvariantViolation(_) => false,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err)
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors_are_fatal() {
        assert!(!Error::from(LlmError::Auth).is_recoverable());
        assert!(!Error::from(LlmError::NoCredentials).is_recoverable());
    }

    #[test]
    fn test_feed_errors_are_scoped() {
        let err = Error::from(FeedError::Unresolvable("https://example.com".into()));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_definitive_fetch_errors_stay_scoped() {
        // non-retryable for the request, but still confined to one source
        let err = Error::from(FetchError::ClientError(404));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_invariant_violation_is_fatal() {
        let err = Error::invariant("item 3 already summarized");
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("already summarized"));
    }
}
