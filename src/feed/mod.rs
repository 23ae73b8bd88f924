//! Feed entry model and RSS/Atom parsing
//!
//! Raw feed payloads are parsed with `feed-rs` and normalized into
//! [`FeedEntry`] records; everything downstream works on that shape
//! regardless of the original wire format.

pub mod resolve;

use chrono::{DateTime, Utc};

use crate::utils::error::FeedError;

/// One normalized feed entry
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub title: String,
    pub url: String,
    /// Origin-assigned identifier, when present
    pub guid: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Embedded full content, when the feed carries one
    pub content_html: Option<String>,
    /// Short summary/description, when the feed carries one
    pub summary_html: Option<String>,
}

/// Parse a raw RSS/Atom payload into normalized entries
///
/// Entries without a usable link are dropped. An empty entry list is not
/// an error here; the resolver treats it as a failed candidate, the
/// ingest path logs it and moves on.
pub fn parse_feed(body: &str) -> Result<Vec<FeedEntry>, FeedError> {
    let feed = feed_rs::parser::parse(body.as_bytes())
        .map_err(|e| FeedError::Parse(e.to_string()))?;

    Ok(feed.entries.into_iter().filter_map(normalize_entry).collect())
}

fn normalize_entry(entry: feed_rs::model::Entry) -> Option<FeedEntry> {
    let url = entry
        .links
        .first()
        .map(|link| link.href.clone())
        .or_else(|| {
            // some feeds put the permalink in the id field
            entry.id.starts_with("http").then(|| entry.id.clone())
        })?;

    let guid = (!entry.id.is_empty()).then(|| entry.id.clone());

    Some(FeedEntry {
        title: entry
            .title
            .map(|t| t.content)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| String::from("Untitled")),
        url,
        guid,
        published_at: entry.published.or(entry.updated),
        content_html: entry.content.and_then(|c| c.body),
        summary_html: entry.summary.map(|t| t.content),
    })
}
