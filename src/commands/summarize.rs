//! Summarize stage: advance pending items through the LLM provider

use anyhow::Context as _;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::storage::Store;
use crate::summarize::provider::select_provider;
use crate::summarize::{RunStats, Summarizer};

/// Hard per-call bound for provider requests; retries are counted
/// separately by the backoff controller
const LLM_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Run the summarize stage once
pub async fn run(config: &Config) -> anyhow::Result<RunStats> {
    let store = Store::open(&config.database.path)?;

    let provider = select_provider(
        &config.llm,
        LLM_REQUEST_TIMEOUT,
        config.summarize.max_output_tokens,
    )
    .context("No LLM provider available; set ANTHROPIC_API_KEY or OPENAI_API_KEY")?;

    let engine = Summarizer::new(provider, &config.summarize);
    let stats = engine.run(&store).await?;

    info!(
        selected = stats.selected,
        summarized = stats.summarized,
        failed = stats.failed,
        "Summarize stage complete"
    );
    Ok(stats)
}
