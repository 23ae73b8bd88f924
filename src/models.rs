// Core data structures for the gleaner pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Feed kind of a source, determining its resolution strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Youtube,
    Substack,
    Medium,
    Site,
    Rss,
}

impl SourceKind {
    /// Get string representation (stored in the `type` column)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Substack => "substack",
            Self::Medium => "medium",
            Self::Site => "site",
            Self::Rss => "rss",
        }
    }

    /// Create from string; unknown tags map to None
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "youtube" => Some(Self::Youtube),
            "substack" => Some(Self::Substack),
            "medium" => Some(Self::Medium),
            "site" => Some(Self::Site),
            "rss" => Some(Self::Rss),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tracked content origin with a resolvable feed
#[derive(Debug, Clone)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub source_url: String,
    /// Resolved feed location; None until resolution has succeeded
    pub feed_url: Option<String>,
    pub kind: SourceKind,
    /// Flips to false when resolution or validation fails; stays false
    /// until the operator corrects the source definition
    pub active: bool,
    pub last_fetch_at: Option<DateTime<Utc>>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// Item lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    New,
    Summarized,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Summarized => "summarized",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "summarized" => Some(Self::Summarized),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Item draft produced by the content extractor, not yet persisted
#[derive(Debug, Clone)]
pub struct ItemDraft {
    pub source_id: i64,
    pub title: String,
    pub url: String,
    pub guid: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub content_text: String,
}

impl ItemDraft {
    /// Fingerprint of this draft's URL, the sole dedup key
    pub fn url_hash(&self) -> String {
        url_fingerprint(&self.url)
    }
}

/// One persisted content item
#[derive(Debug, Clone)]
pub struct Item {
    pub id: i64,
    pub source_id: i64,
    pub title: String,
    pub url: String,
    pub guid: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    pub content_text: String,
    pub url_hash: String,
    pub status: ItemStatus,
    pub summary_json: Option<String>,
    pub model_used: Option<String>,
}

/// Deterministic SHA-256 fingerprint of an item URL
///
/// Same URL always yields the same fingerprint; the store enforces
/// uniqueness on it, so re-ingesting a URL can never create a second row.
pub fn url_fingerprint(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}
