//! Integration tests for the summarization engine
//!
//! A scripted provider stands in for the LLM so the state machine, the
//! per-run cap, and the one-shot JSON repair can be asserted exactly.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use gleaner::config::SummarizeConfig;
use gleaner::error::Error;
use gleaner::models::{ItemDraft, SourceKind};
use gleaner::sources::SourceEntry;
use gleaner::storage::{InsertOutcome, Store};
use gleaner::summarize::provider::Provider;
use gleaner::summarize::Summarizer;
use gleaner::utils::error::LlmError;

const VALID_SUMMARY: &str = r#"{
    "eli5": "Simple summary.",
    "eli16": "Technical summary.",
    "why_this_matters": "Because it does.",
    "what_changed": "Something shipped.",
    "key_quotes": [],
    "confidence_unknowns": "Source is brief."
}"#;

/// Provider that replays a scripted sequence of completions
struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Provider that always returns a valid summary
    fn always_valid() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn model_id(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(VALID_SUMMARY.to_string()),
        }
    }
}

fn store_with_pending(count: usize) -> Store {
    let store = Store::in_memory().unwrap();
    let source = store
        .upsert_source(&SourceEntry {
            name: "Source".to_string(),
            url: "https://example.com".to_string(),
            kind: SourceKind::Rss,
            feed_url: None,
        })
        .unwrap();

    for i in 0..count {
        let outcome = store
            .insert_item(&ItemDraft {
                source_id: source.id,
                title: format!("Post {i}"),
                url: format!("https://example.com/p/{i}"),
                guid: None,
                published_at: Some(Utc::now()),
                content_text: "Some article text to summarize.".to_string(),
            })
            .unwrap();
        assert!(matches!(outcome, InsertOutcome::Inserted(_)));
    }

    store
}

fn config(cap: usize) -> SummarizeConfig {
    SummarizeConfig {
        max_items_per_run: cap,
        max_input_tokens: 2000,
        max_output_tokens: 500,
    }
}

#[tokio::test]
async fn test_successful_run_marks_items() {
    let store = store_with_pending(3);
    let engine = Summarizer::new(Box::new(ScriptedProvider::always_valid()), &config(25));

    let stats = engine.run(&store).await.unwrap();

    assert_eq!(stats.selected, 3);
    assert_eq!(stats.summarized, 3);
    assert_eq!(stats.failed, 0);

    let store_stats = store.stats().unwrap();
    assert_eq!(store_stats.items_new, 0);
    assert_eq!(store_stats.items_summarized, 3);

    let rows = store.recent_summarized(10).unwrap();
    assert_eq!(rows[0].0.model_used.as_deref(), Some("scripted-model"));
}

#[tokio::test]
async fn test_cap_is_never_exceeded() {
    let store = store_with_pending(30);
    let engine = Summarizer::new(Box::new(ScriptedProvider::always_valid()), &config(25));

    let stats = engine.run(&store).await.unwrap();

    assert_eq!(stats.selected, 25);
    assert_eq!(stats.summarized, 25);

    let store_stats = store.stats().unwrap();
    assert_eq!(store_stats.items_summarized, 25);
    assert_eq!(store_stats.items_new, 5); // remainder waits for next run
}

#[tokio::test]
async fn test_invalid_json_recovers_via_repair() {
    let store = store_with_pending(1);
    let provider = ScriptedProvider::new(vec![
        Ok("this is not json at all".to_string()),
        Ok(VALID_SUMMARY.to_string()),
    ]);
    let engine = Summarizer::new(Box::new(provider), &config(25));

    let stats = engine.run(&store).await.unwrap();
    assert_eq!(stats.summarized, 1);
    assert_eq!(store.stats().unwrap().items_summarized, 1);
}

#[tokio::test]
async fn test_failed_repair_leaves_item_pending() {
    let store = store_with_pending(1);
    let provider = ScriptedProvider::new(vec![
        Ok("still not json".to_string()),
        Ok("{\"eli5\": \"missing the rest\"".to_string()),
    ]);
    let engine = Summarizer::new(Box::new(provider), &config(25));

    let stats = engine.run(&store).await.unwrap();

    assert_eq!(stats.summarized, 0);
    assert_eq!(stats.failed, 1);

    let store_stats = store.stats().unwrap();
    assert_eq!(store_stats.items_new, 1);
    assert_eq!(store_stats.items_summarized, 0);

    let pending = store.select_pending(25).unwrap();
    assert!(pending[0].summary_json.is_none());
}

#[tokio::test]
async fn test_repair_uses_exactly_two_calls() {
    let store = store_with_pending(1);
    let provider: &'static ScriptedProvider = Box::leak(Box::new(ScriptedProvider::new(vec![
        Ok("garbage".to_string()),
        Ok("more garbage".to_string()),
    ])));
    let engine = Summarizer::new(Box::new(CountingHandle { inner: provider }), &config(25));

    let stats = engine.run(&store).await.unwrap();
    assert_eq!(stats.failed, 1);
    // one original request plus exactly one corrective re-prompt
    assert_eq!(provider.calls(), 2);
}

/// Forwarding handle so the test keeps access to the call counter after
/// handing the provider to the engine
struct CountingHandle {
    inner: &'static ScriptedProvider,
}

#[async_trait::async_trait]
impl Provider for CountingHandle {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        self.inner.complete(system, user).await
    }
}

#[tokio::test]
async fn test_one_failure_does_not_abort_run() {
    let store = store_with_pending(3);
    // first item: two garbage completions (original + repair), then
    // valid completions for the remaining items
    let provider = ScriptedProvider::new(vec![
        Ok("garbage".to_string()),
        Ok("garbage again".to_string()),
    ]);
    let engine = Summarizer::new(Box::new(provider), &config(25));

    let stats = engine.run(&store).await.unwrap();

    assert_eq!(stats.summarized, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(store.stats().unwrap().items_new, 1);
}

#[tokio::test]
async fn test_auth_failure_aborts_stage() {
    let store = store_with_pending(3);
    let provider = ScriptedProvider::new(vec![Err(LlmError::Auth)]);
    let engine = Summarizer::new(Box::new(provider), &config(25));

    let err = engine.run(&store).await.unwrap_err();
    assert!(matches!(err, Error::Llm(LlmError::Auth)));

    // nothing was marked before the abort
    assert_eq!(store.stats().unwrap().items_summarized, 0);
}

#[tokio::test]
async fn test_transient_provider_error_is_retried() {
    let store = store_with_pending(1);
    let provider = ScriptedProvider::new(vec![
        Err(LlmError::Status(503)),
        Ok(VALID_SUMMARY.to_string()),
    ]);
    let engine = Summarizer::with_retry(
        Box::new(provider),
        &config(25),
        gleaner::utils::retry::RetryConfig::with_delays(2, 1, 10),
    );

    let stats = engine.run(&store).await.unwrap();
    assert_eq!(stats.summarized, 1);
}

#[tokio::test]
async fn test_empty_store_is_a_noop() {
    let store = Store::in_memory().unwrap();
    let engine = Summarizer::new(Box::new(ScriptedProvider::always_valid()), &config(25));

    let stats = engine.run(&store).await.unwrap();
    assert_eq!(stats.selected, 0);
    assert_eq!(stats.summarized, 0);
}
