//! Common utilities: error types and retry support

pub mod error;
pub mod retry;

pub use error::{FeedError, FetchError, LlmError};
pub use retry::{with_retry_if, RetryConfig};
