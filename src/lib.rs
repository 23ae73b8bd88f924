//! gleaner - Feed ingestion and summarization pipeline
//!
//! A sequential batch pipeline that ingests content items from feed-like
//! sources, deduplicates them by URL fingerprint, enriches them with a
//! structured LLM-generated summary, and persists the result for
//! rendering.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`sources`] - Declarative source list loading
//! - [`fetch`] - Conditional HTTP retrieval with retry and rate limiting
//! - [`feed`] - RSS/Atom parsing and feed location resolution
//! - [`extract`] - Heuristic content extraction and text cleanup
//! - [`storage`] - SQLite store with exact URL deduplication
//! - [`summarize`] - LLM summarization engine with provider fallback
//! - [`render`] - Static HTML page generation
//! - [`commands`] - CLI stage entry points
//! - [`utils`] - Retry support and domain error types
//!
//! # Example
//!
//! ```no_run
//! use gleaner::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     config.validate()?;
//!     let stats = gleaner::commands::fetch::run(&config).await?;
//!     println!("{} new items", stats.items_inserted);
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod extract;
pub mod feed;
pub mod fetch;
pub mod models;
pub mod render;
pub mod sources;
pub mod storage;
pub mod summarize;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::fetch::{FetchClient, FetchOutcome, Validators};
    pub use crate::models::{Item, ItemDraft, ItemStatus, Source, SourceKind};
    pub use crate::storage::{InsertOutcome, Store};
    pub use crate::summarize::Summarizer;
}

// Direct re-exports for convenience
pub use error::{Error, Result};
pub use models::{Item, ItemDraft, ItemStatus, Source, SourceKind};
