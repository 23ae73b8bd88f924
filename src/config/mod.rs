//! Configuration management for the gleaner pipeline
//!
//! Configuration is loaded from environment variables with sensible
//! defaults, or from a TOML file. Provider credentials always come from
//! the environment and are never written to or read from config files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Declarative source list location
    pub sources: SourcesConfig,

    /// Fetch and extraction configuration
    pub fetch: FetchConfig,

    /// Summarization configuration
    pub summarize: SummarizeConfig,

    /// Renderer configuration
    pub render: RenderConfig,

    /// LLM provider credentials; environment-only
    #[serde(skip)]
    pub llm: LlmConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub path: PathBuf,
}

/// Declarative source list configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Path to the TOML source list
    pub path: PathBuf,
}

/// Fetch and extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds (hard per-request bound)
    pub request_timeout_secs: u64,

    /// Rate limit (requests per second)
    pub rate_limit: u32,

    /// Maximum characters kept per item excerpt (hard cut)
    pub max_chars_per_item: usize,
}

/// Summarization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeConfig {
    /// Hard cap of items processed per run
    pub max_items_per_run: usize,

    /// Input budget in token equivalents (~4 chars per token)
    pub max_input_tokens: usize,

    /// Output budget in token equivalents
    pub max_output_tokens: u32,
}

/// Renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Output directory for the generated page
    pub output_dir: PathBuf,

    /// Maximum number of summarized items displayed
    pub max_items: usize,
}

/// LLM provider credentials and model identifiers
///
/// The primary provider is used whenever its credential is configured;
/// otherwise the fallback. Absence of both is fatal for the summarize
/// stage only.
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
}

impl LlmConfig {
    /// Load provider credentials from environment variables
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok().filter(|k| !k.is_empty()),
            anthropic_model: std::env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| String::from("claude-haiku-4-5-20251001")),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| String::from("gpt-4o-mini")),
        }
    }

    /// Whether any provider credential is configured
    pub fn has_credentials(&self) -> bool {
        self.anthropic_api_key.is_some() || self.openai_api_key.is_some()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let db_path = std::env::var("GLEANER_DB_PATH")
            .unwrap_or_else(|_| String::from("data.sqlite"))
            .into();

        let sources_path = std::env::var("GLEANER_SOURCES_PATH")
            .unwrap_or_else(|_| String::from("sources.toml"))
            .into();

        let request_timeout_secs = std::env::var("GLEANER_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(15);

        let rate_limit = std::env::var("GLEANER_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(2);

        let max_chars_per_item = std::env::var("GLEANER_MAX_CHARS_PER_ITEM")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(8000);

        let max_items_per_run = std::env::var("GLEANER_MAX_ITEMS_PER_RUN")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(25);

        Ok(Self {
            database: DatabaseConfig { path: db_path },
            sources: SourcesConfig { path: sources_path },
            fetch: FetchConfig {
                request_timeout_secs,
                rate_limit,
                max_chars_per_item,
            },
            summarize: SummarizeConfig {
                max_items_per_run,
                max_input_tokens: 2000,
                max_output_tokens: 500,
            },
            render: RenderConfig {
                output_dir: PathBuf::from("site"),
                max_items: 100,
            },
            llm: LlmConfig::from_env(),
        })
    }

    /// Load configuration from a TOML file; credentials still come from
    /// the environment
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        config.llm = LlmConfig::from_env();
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.fetch.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.fetch.rate_limit == 0 {
            anyhow::bail!("rate_limit must be greater than 0");
        }

        if self.fetch.max_chars_per_item == 0 {
            anyhow::bail!("max_chars_per_item must be greater than 0");
        }

        if self.summarize.max_items_per_run == 0 {
            anyhow::bail!("max_items_per_run must be greater than 0");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: PathBuf::from("data.sqlite"),
            },
            sources: SourcesConfig {
                path: PathBuf::from("sources.toml"),
            },
            fetch: FetchConfig {
                request_timeout_secs: 15,
                rate_limit: 2,
                max_chars_per_item: 8000,
            },
            summarize: SummarizeConfig {
                max_items_per_run: 25,
                max_input_tokens: 2000,
                max_output_tokens: 500,
            },
            render: RenderConfig {
                output_dir: PathBuf::from("site"),
                max_items: 100,
            },
            llm: LlmConfig::default(),
        }
    }
}
