//! Error types for the gleaner pipeline
//!
//! Domain errors carry their own retryability so the backoff controller
//! can distinguish transient failures from definitive ones.

use thiserror::Error;

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Server error with status code (5xx)
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Client error with status code (4xx, excluding 304)
    #[error("Client error: {0}")]
    ClientError(u16),

    /// Maximum retry attempts exceeded
    #[error("Maximum retry attempts exceeded")]
    MaxRetriesExceeded,

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Whether the failure may clear on a later attempt
    ///
    /// Retries: timeouts, 5xx, 429, transport-level connection errors.
    /// Does not retry: other 4xx, invalid URLs.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::ServerError(_) => true,
            Self::ClientError(status) => *status == 429,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::MaxRetriesExceeded | Self::InvalidUrl(_) => false,
        }
    }
}

/// Errors that can occur during feed resolution and parsing
#[derive(Error, Debug)]
pub enum FeedError {
    /// Underlying fetch failure
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Payload parsed but contained no entries
    #[error("Feed contains no entries")]
    NoEntries,

    /// Payload could not be parsed as RSS/Atom
    #[error("Feed could not be parsed: {0}")]
    Parse(String),

    /// No candidate feed location validated for the source
    #[error("No feed candidate validated for {0}")]
    Unresolvable(String),
}

/// Errors that can occur during LLM calls and summary validation
#[derive(Error, Debug)]
pub enum LlmError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned a non-success status
    #[error("Provider returned status {0}")]
    Status(u16),

    /// Credential rejected by the provider; aborts the stage
    #[error("Authentication rejected by provider")]
    Auth,

    /// Neither primary nor fallback credential configured
    #[error("No provider credential configured")]
    NoCredentials,

    /// Provider returned an empty completion
    #[error("Empty completion from provider")]
    EmptyCompletion,

    /// Completion did not validate as a structured summary after repair
    #[error("Summary JSON failed validation")]
    InvalidSummary,
}

impl LlmError {
    /// Whether the failure may clear on a later attempt
    ///
    /// Rate limits and server-class responses retry; authentication and
    /// validation failures are definitive.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status(status) => *status == 429 || *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::EmptyCompletion => true,
            Self::Auth | Self::NoCredentials | Self::InvalidSummary => false,
        }
    }
}
