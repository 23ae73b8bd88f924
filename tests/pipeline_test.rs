//! End-to-end pipeline tests
//!
//! Drives the ingest stage against mock origins and the summarize stage
//! against a stub provider, asserting the lifecycle scenarios end to end:
//! resolve → conditional fetch → extract → dedup → summarize.

mod common;

use gleaner::commands::fetch::{ingest_all, FetchStats};
use gleaner::config::SummarizeConfig;
use gleaner::fetch::FetchClient;
use gleaner::models::{ItemStatus, SourceKind};
use gleaner::sources::{SourceEntry, SourceList};
use gleaner::storage::Store;
use gleaner::summarize::provider::Provider;
use gleaner::summarize::Summarizer;
use gleaner::utils::error::LlmError;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{fast_retry, fetch_config, long_description, rss_feed};

const VALID_SUMMARY: &str = r#"{
    "eli5": "Simple summary.",
    "eli16": "Technical summary.",
    "why_this_matters": "Because it does.",
    "what_changed": "Something shipped.",
    "key_quotes": ["worth quoting"],
    "confidence_unknowns": "Source is brief."
}"#;

struct StubProvider;

#[async_trait::async_trait]
impl Provider for StubProvider {
    fn model_id(&self) -> &str {
        "stub-model"
    }

    async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        Ok(VALID_SUMMARY.to_string())
    }
}

fn client() -> FetchClient {
    FetchClient::with_retry(&fetch_config(), fast_retry()).unwrap()
}

fn source_list(entries: Vec<SourceEntry>) -> SourceList {
    SourceList { sources: entries }
}

fn substack_entry(base: &str) -> SourceEntry {
    SourceEntry {
        name: "Example Substack".to_string(),
        url: format!("{base}/"),
        kind: SourceKind::Substack,
        feed_url: None,
    }
}

async fn run_ingest(store: &Store, list: &SourceList) -> FetchStats {
    ingest_all(store, &client(), list, 8000).await.unwrap()
}

/// Substack source resolves to /feed; ingesting the same entry twice
/// produces exactly one item; summarization transitions it with the
/// provider's model recorded.
#[tokio::test]
async fn test_substack_lifecycle_end_to_end() {
    let server = MockServer::start().await;
    let entry_url = format!("{}/p/1", server.uri());
    let feed = rss_feed(&[("First Post", &entry_url, &long_description())]);

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(&feed))
        .mount(&server)
        .await;

    let store = Store::in_memory().unwrap();
    let list = source_list(vec![substack_entry(&server.uri())]);

    // first run ingests the entry
    let stats = run_ingest(&store, &list).await;
    assert_eq!(stats.items_inserted, 1);

    // second run sees the same entry and inserts nothing
    let stats = run_ingest(&store, &list).await;
    assert_eq!(stats.items_inserted, 0);

    let pending = store.select_pending(25).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status, ItemStatus::New);
    assert_eq!(pending[0].url, entry_url);

    // summarize transitions the item
    let engine = Summarizer::new(
        Box::new(StubProvider),
        &SummarizeConfig {
            max_items_per_run: 25,
            max_input_tokens: 2000,
            max_output_tokens: 500,
        },
    );
    let stats = engine.run(&store).await.unwrap();
    assert_eq!(stats.summarized, 1);

    let rows = store.recent_summarized(10).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0.status, ItemStatus::Summarized);
    assert_eq!(rows[0].0.model_used.as_deref(), Some("stub-model"));

    let payload: serde_json::Value =
        serde_json::from_str(rows[0].0.summary_json.as_deref().unwrap()).unwrap();
    assert_eq!(payload["eli5"], "Simple summary.");
}

/// An unchanged feed answers 304 on the second run: no new items and the
/// stored validators stay exactly as they were.
#[tokio::test]
async fn test_not_modified_feed_is_skipped() {
    let server = MockServer::start().await;
    let entry_url = format!("{}/p/1", server.uri());
    let feed = rss_feed(&[("Post", &entry_url, &long_description())]);

    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(header("if-none-match", "\"v1\""))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(&feed)
                .insert_header("etag", "\"v1\""),
        )
        .with_priority(5)
        .mount(&server)
        .await;

    let store = Store::in_memory().unwrap();
    let list = source_list(vec![substack_entry(&server.uri())]);

    let stats = run_ingest(&store, &list).await;
    assert_eq!(stats.items_inserted, 1);
    assert_eq!(stats.feeds_not_modified, 0);

    let before = store.get_source(1).unwrap().unwrap();
    assert_eq!(before.etag.as_deref(), Some("\"v1\""));

    let stats = run_ingest(&store, &list).await;
    assert_eq!(stats.items_inserted, 0);
    assert_eq!(stats.feeds_not_modified, 1);

    let after = store.get_source(1).unwrap().unwrap();
    assert_eq!(after.etag, before.etag);
    assert_eq!(after.last_fetch_at, before.last_fetch_at);
    assert_eq!(store.stats().unwrap().items_total, 1);
}

/// A site source with no advertised link and no conventional path ends
/// the run deactivated with nothing ingested, and is skipped thereafter.
#[tokio::test]
async fn test_unresolvable_site_is_deactivated() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>No feed here</body></html>"))
        .mount(&server)
        .await;

    let store = Store::in_memory().unwrap();
    let list = source_list(vec![SourceEntry {
        name: "Feedless Site".to_string(),
        url: server.uri(),
        kind: SourceKind::Site,
        feed_url: None,
    }]);

    let stats = run_ingest(&store, &list).await;
    assert_eq!(stats.sources_deactivated, 1);
    assert_eq!(stats.items_inserted, 0);

    let source = store.get_source(1).unwrap().unwrap();
    assert!(!source.active);
    assert_eq!(store.stats().unwrap().items_total, 0);

    // next run skips it without another discovery attempt
    let stats = run_ingest(&store, &list).await;
    assert_eq!(stats.sources_skipped, 1);
    assert_eq!(stats.sources_deactivated, 0);
}

/// One broken source never aborts the rest of the batch.
#[tokio::test]
async fn test_failing_source_does_not_abort_batch() {
    let server = MockServer::start().await;
    let entry_url = format!("{}/p/1", server.uri());
    let feed = rss_feed(&[("Post", &entry_url, &long_description())]);

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(&feed))
        .mount(&server)
        .await;

    let store = Store::in_memory().unwrap();
    let list = source_list(vec![
        SourceEntry {
            name: "Broken".to_string(),
            url: "http://127.0.0.1:1/".to_string(), // connection refused
            kind: SourceKind::Rss,
            feed_url: None,
        },
        substack_entry(&server.uri()),
    ]);

    let stats = run_ingest(&store, &list).await;
    assert_eq!(stats.sources_deactivated, 1);
    assert_eq!(stats.items_inserted, 1);
}

/// When the feed entry carries only a trivial description, the entry's
/// own page is fetched and mined for the excerpt.
#[tokio::test]
async fn test_trivial_content_falls_back_to_page() {
    let server = MockServer::start().await;
    let entry_url = format!("{}/p/1", server.uri());
    let feed = rss_feed(&[("Post", &entry_url, "tiny")]);

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(&feed))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/p/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><article><p>The full article body, recovered from the page itself.</p></article></body></html>",
        ))
        .mount(&server)
        .await;

    let store = Store::in_memory().unwrap();
    let list = source_list(vec![substack_entry(&server.uri())]);
    run_ingest(&store, &list).await;

    let pending = store.select_pending(25).unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].content_text.contains("recovered from the page"));
}

/// A failed page fetch still produces the item with a partial excerpt.
#[tokio::test]
async fn test_page_fetch_failure_keeps_partial_item() {
    let server = MockServer::start().await;
    let entry_url = format!("{}/p/1", server.uri());
    let feed = rss_feed(&[("Post", &entry_url, "tiny")]);

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(&feed))
        .mount(&server)
        .await;
    // /p/1 stays unmounted and 404s

    let store = Store::in_memory().unwrap();
    let list = source_list(vec![substack_entry(&server.uri())]);
    let stats = run_ingest(&store, &list).await;

    assert_eq!(stats.items_inserted, 1);
    let pending = store.select_pending(25).unwrap();
    assert_eq!(pending[0].content_text, "tiny");
}

/// The stored excerpt never exceeds the configured character bound.
#[tokio::test]
async fn test_excerpt_respects_character_bound() {
    let server = MockServer::start().await;
    let entry_url = format!("{}/p/1", server.uri());
    let huge = "long words ".repeat(500);
    let feed = rss_feed(&[("Post", &entry_url, &huge)]);

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(&feed))
        .mount(&server)
        .await;

    let store = Store::in_memory().unwrap();
    let list = source_list(vec![substack_entry(&server.uri())]);
    ingest_all(&store, &client(), &list, 1000).await.unwrap();

    let pending = store.select_pending(25).unwrap();
    assert!(pending[0].content_text.chars().count() <= 1000);
}
