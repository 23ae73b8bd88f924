//! Summarization engine
//!
//! Drives the item state machine: `new` --(successful summarize)-->
//! `summarized`. A failed item stays `new` and is retried on the next
//! run; there is no failed state. At most `max_items_per_run` items are
//! processed per invocation, a cost-control invariant rather than a
//! tuning default. One item's failure never aborts the rest of the run;
//! credential failures and invariant violations do.

pub mod provider;
pub mod schema;

use tracing::{error, info, warn};

use crate::config::SummarizeConfig;
use crate::error::{Error, Result};
use crate::extract::sanitize::clip;
use crate::models::Item;
use crate::storage::Store;
use crate::utils::error::LlmError;
use crate::utils::retry::{with_retry_if, RetryConfig};
use provider::Provider;
use schema::{parse_summary, Summary};

/// Rough chars-per-token estimate used to convert the input token budget
/// into a character clip
const CHARS_PER_TOKEN: usize = 4;

const SUMMARY_SYSTEM_PROMPT: &str = r#"You are a content summarizer. Given an article title and text, produce a JSON object with exactly these fields:

{
  "eli5": "Explain like I'm 5 - simple, accessible summary",
  "eli16": "Explain like I'm 16 - more technical, includes key details",
  "why_this_matters": "Why this is important or relevant",
  "what_changed": "What's new or different from before",
  "key_quotes": ["Array of genuinely useful quotes from the text, or empty array if none"],
  "confidence_unknowns": "What you're not sure about or what's missing from the source"
}

Rules:
- Output ONLY valid JSON, no markdown fences, no extra text
- Keep each field to 1-2 sentences max
- key_quotes: max 2 quotes, or empty array [] if none are genuinely useful
- If the content is short or unclear, do your best and note limitations in confidence_unknowns"#;

const REPAIR_SYSTEM_PROMPT: &str = "Fix this JSON.";

fn repair_prompt(raw: &str) -> String {
    format!(
        "The following text was supposed to be valid JSON but isn't. Fix it and return ONLY the corrected JSON object. Do not add markdown fences or explanation.\n\nInvalid JSON:\n{raw}"
    )
}

/// Per-run outcome counts
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub selected: usize,
    pub summarized: usize,
    pub failed: usize,
}

/// Summarization engine over a fixed provider
pub struct Summarizer {
    provider: Box<dyn Provider>,
    retry: RetryConfig,
    max_items_per_run: usize,
    max_input_chars: usize,
}

impl Summarizer {
    /// Create an engine bound to an explicit provider handle
    pub fn new(provider: Box<dyn Provider>, config: &SummarizeConfig) -> Self {
        Self::with_retry(provider, config, RetryConfig::default())
    }

    /// Create an engine with a custom retry policy
    pub fn with_retry(
        provider: Box<dyn Provider>,
        config: &SummarizeConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            provider,
            retry,
            max_items_per_run: config.max_items_per_run,
            max_input_chars: config.max_input_tokens * CHARS_PER_TOKEN,
        }
    }

    /// Process one batch of pending items
    ///
    /// Selects at most the configured cap, summarizes each in turn, and
    /// marks successes. Per-item failures are logged and counted; the
    /// run continues. Authentication failures and store invariant
    /// violations abort the stage.
    pub async fn run(&self, store: &Store) -> Result<RunStats> {
        let items = store.select_pending(self.max_items_per_run)?;
        let mut stats = RunStats {
            selected: items.len(),
            ..Default::default()
        };

        if items.is_empty() {
            info!("No pending items to summarize");
            return Ok(stats);
        }

        info!(
            count = items.len(),
            cap = self.max_items_per_run,
            model = %self.provider.model_id(),
            "Summarizing pending items"
        );

        for item in &items {
            match self.summarize_item(item).await {
                Ok(summary) => {
                    let payload = serde_json::to_string(&summary)?;
                    store.mark_summarized(item.id, &payload, self.provider.model_id())?;
                    stats.summarized += 1;
                    info!(item_id = item.id, "Item summarized");
                }
                Err(LlmError::Auth) => {
                    error!("Provider rejected credentials, aborting stage");
                    return Err(Error::Llm(LlmError::Auth));
                }
                Err(e) => {
                    // item stays `new` and will be retried next run;
                    // log the failure kind only, never content
                    warn!(item_id = item.id, error = %e, "Summarization failed, item stays pending");
                    stats.failed += 1;
                }
            }
        }

        info!(
            summarized = stats.summarized,
            failed = stats.failed,
            "Summarize run complete"
        );
        Ok(stats)
    }

    /// Summarize a single item, with one corrective re-prompt on
    /// malformed output
    async fn summarize_item(&self, item: &Item) -> std::result::Result<Summary, LlmError> {
        let excerpt = self.clip_for_input(&item.content_text);
        let user = format!("Title: {}\n\nContent:\n{}", item.title, excerpt);

        let response = self.complete_with_retry(SUMMARY_SYSTEM_PROMPT, &user).await?;
        if let Some(summary) = parse_summary(&response) {
            return Ok(summary);
        }

        warn!(item_id = item.id, "Summary JSON invalid, issuing repair prompt");
        let repaired = self
            .complete_with_retry(REPAIR_SYSTEM_PROMPT, &repair_prompt(&response))
            .await?;

        parse_summary(&repaired).ok_or(LlmError::InvalidSummary)
    }

    /// Clip the excerpt to the input token budget
    fn clip_for_input(&self, text: &str) -> String {
        if text.chars().count() > self.max_input_chars {
            format!("{}\n[truncated]", clip(text, self.max_input_chars))
        } else {
            text.to_string()
        }
    }

    async fn complete_with_retry(
        &self,
        system: &str,
        user: &str,
    ) -> std::result::Result<String, LlmError> {
        with_retry_if(
            &self.retry,
            || self.provider.complete(system, user),
            LlmError::is_retryable,
        )
        .await
    }
}
