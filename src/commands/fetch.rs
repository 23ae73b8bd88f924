//! Fetch stage: resolve feeds, fetch conditionally, ingest new items
//!
//! One pass over the declarative source list. Each source is isolated:
//! resolution failure deactivates it, fetch failure is logged, and the
//! run continues either way. Only storage failures abort the stage.

use anyhow::Context as _;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::ContentExtractor;
use crate::feed::parse_feed;
use crate::feed::resolve::FeedResolver;
use crate::fetch::{FetchClient, FetchOutcome, Validators};
use crate::models::Source;
use crate::sources::SourceList;
use crate::storage::{InsertOutcome, Store};

/// Per-run ingest counts
#[derive(Debug, Clone, Default)]
pub struct FetchStats {
    pub sources_processed: usize,
    pub sources_skipped: usize,
    pub sources_deactivated: usize,
    pub feeds_not_modified: usize,
    pub items_inserted: usize,
}

/// Result of ingesting one source's feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedIngest {
    /// Origin reported the feed unchanged; nothing was read or written
    NotModified,

    /// Feed was fetched and parsed
    Ingested { entries: usize, new_items: usize },
}

/// Run the fetch stage over the configured source list
pub async fn run(config: &Config) -> anyhow::Result<FetchStats> {
    let list = SourceList::load(&config.sources.path)?;
    info!(
        count = list.sources.len(),
        path = %config.sources.path.display(),
        "Loaded source list"
    );

    let store = Store::open(&config.database.path)?;
    let client = FetchClient::new(&config.fetch).context("Failed to create fetch client")?;

    let stats = ingest_all(&store, &client, &list, config.fetch.max_chars_per_item).await?;

    info!(
        processed = stats.sources_processed,
        deactivated = stats.sources_deactivated,
        not_modified = stats.feeds_not_modified,
        new_items = stats.items_inserted,
        "Fetch stage complete"
    );
    Ok(stats)
}

/// Ingest every source in the list against the given store
pub async fn ingest_all(
    store: &Store,
    client: &FetchClient,
    list: &SourceList,
    max_chars_per_item: usize,
) -> Result<FetchStats> {
    let resolver = FeedResolver::new(client);
    let extractor = ContentExtractor::new(client, max_chars_per_item);
    let mut stats = FetchStats::default();

    for entry in &list.sources {
        info!(name = %entry.name, "Processing source");
        let source = store.upsert_source(entry)?;

        if !source.active {
            debug!(name = %entry.name, "Source inactive, skipping");
            stats.sources_skipped += 1;
            continue;
        }

        let feed_url = match &source.feed_url {
            Some(url) => url.clone(),
            None => match resolver.resolve(entry).await {
                Ok(url) => {
                    store.set_feed_url(source.id, &url)?;
                    url
                }
                Err(e) => {
                    warn!(name = %entry.name, error = %e, "Feed resolution failed, deactivating source");
                    store.deactivate_source(source.id)?;
                    stats.sources_deactivated += 1;
                    continue;
                }
            },
        };

        stats.sources_processed += 1;

        match ingest_feed(store, client, &extractor, &source, &feed_url).await {
            Ok(FeedIngest::NotModified) => {
                info!(name = %entry.name, "Feed not modified");
                stats.feeds_not_modified += 1;
            }
            Ok(FeedIngest::Ingested { entries, new_items }) => {
                info!(name = %entry.name, entries, new_items, "Source ingested");
                stats.items_inserted += new_items;
            }
            // a transient origin problem is scoped to this source; storage
            // failures are not and abort the stage
            Err(e) if e.is_recoverable() => {
                warn!(name = %entry.name, error = %e, "Feed fetch failed, continuing with remaining sources");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(stats)
}

/// Fetch one feed conditionally and insert its new entries
pub async fn ingest_feed(
    store: &Store,
    client: &FetchClient,
    extractor: &ContentExtractor<'_>,
    source: &Source,
    feed_url: &str,
) -> Result<FeedIngest> {
    let validators = Validators {
        etag: source.etag.clone(),
        last_modified: source.last_modified.clone(),
    };

    let (body, fresh_validators) = match client.get_conditional(feed_url, &validators).await? {
        // validators stay untouched so the next run re-sends them
        FetchOutcome::NotModified => return Ok(FeedIngest::NotModified),
        FetchOutcome::Fetched { body, validators } => (body, validators),
    };

    store.update_validators(source.id, &fresh_validators)?;

    let entries = parse_feed(&body).map_err(Error::Feed)?;
    if entries.is_empty() {
        warn!(feed_url = %feed_url, "No entries found in feed");
        return Ok(FeedIngest::Ingested {
            entries: 0,
            new_items: 0,
        });
    }

    let mut new_items = 0;
    for entry in &entries {
        // known URLs are skipped before any page fetch; insert_item
        // remains the dedup authority for the race-free case
        if store.contains_url(&entry.url)? {
            continue;
        }

        let draft = extractor.extract(source.id, entry).await;
        if let InsertOutcome::Inserted(_) = store.insert_item(&draft)? {
            info!(title = %entry.title, "New item ingested");
            new_items += 1;
        }
    }

    Ok(FeedIngest::Ingested {
        entries: entries.len(),
        new_items,
    })
}
