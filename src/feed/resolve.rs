//! Feed location resolution
//!
//! Maps a source definition to a concrete feed URL using one deterministic
//! rule per source kind. Candidates are validated by fetching and parsing;
//! the first candidate yielding at least one entry wins. A source whose
//! candidates all fail is deactivated by the caller and the run continues.

use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::feed::parse_feed;
use crate::fetch::FetchClient;
use crate::models::SourceKind;
use crate::sources::SourceEntry;
use crate::utils::error::FeedError;

/// Conventional feed paths probed for `site` sources, in order.
/// The nested variants cover common static-site generators.
const PROBE_PATHS: &[&str] = &[
    "/feed",
    "/rss",
    "/rss.xml",
    "/atom.xml",
    "/feed.xml",
    "/index.xml",
    "/feed/feed.xml",
    "/feed/atom.xml",
    "/feed/index.xml",
];

/// Resolves and validates feed locations for source definitions
pub struct FeedResolver<'a> {
    client: &'a FetchClient,
}

impl<'a> FeedResolver<'a> {
    pub fn new(client: &'a FetchClient) -> Self {
        Self { client }
    }

    /// Resolve the feed for one source definition
    ///
    /// An explicit `feed_url` in the definition is authoritative and skips
    /// discovery, but is still validated before use.
    pub async fn resolve(&self, entry: &SourceEntry) -> Result<String, FeedError> {
        if let Some(feed_url) = &entry.feed_url {
            debug!(feed_url = %feed_url, "Using explicit feed location");
            return self.validate(feed_url).await;
        }

        let base = entry.url.trim_end_matches('/');

        match entry.kind {
            // channel feeds must be pre-resolved externally; without one
            // there is nothing to discover here
            SourceKind::Youtube => Err(FeedError::Unresolvable(entry.url.clone())),
            SourceKind::Rss => self.validate(&entry.url).await,
            SourceKind::Substack => self.validate(&format!("{base}/feed")).await,
            SourceKind::Medium => match medium_feed_candidate(base) {
                Some(candidate) => self.validate(&candidate).await,
                None => Err(FeedError::Unresolvable(entry.url.clone())),
            },
            SourceKind::Site => self.discover_site_feed(base).await,
        }
    }

    /// Validate a candidate: fetch it and require at least one entry
    async fn validate(&self, candidate: &str) -> Result<String, FeedError> {
        let body = self.client.get(candidate).await?;
        let entries = parse_feed(&body)?;
        if entries.is_empty() {
            return Err(FeedError::NoEntries);
        }
        info!(feed_url = %candidate, entries = entries.len(), "Feed candidate validated");
        Ok(candidate.to_string())
    }

    /// Discover a feed for a generic site
    ///
    /// Checks the page for an advertised alternate-feed link first, then
    /// probes the conventional paths in order.
    async fn discover_site_feed(&self, base: &str) -> Result<String, FeedError> {
        if let Ok(page) = self.client.get(base).await {
            if let Some(href) = find_alternate_link(&page, base) {
                debug!(href = %href, "Found advertised alternate feed link");
                if let Ok(feed) = self.validate(&href).await {
                    return Ok(feed);
                }
            }
        }

        for path in PROBE_PATHS {
            let candidate = format!("{base}{path}");
            if let Ok(feed) = self.validate(&candidate).await {
                return Ok(feed);
            }
        }

        Err(FeedError::Unresolvable(base.to_string()))
    }
}

/// Extract the first advertised RSS/Atom alternate link from page markup
fn find_alternate_link(html: &str, base: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"link[rel="alternate"]"#).ok()?;

    for link in document.select(&selector) {
        let link_type = link.value().attr("type").unwrap_or("").to_lowercase();
        if !link_type.contains("rss") && !link_type.contains("atom") {
            continue;
        }
        let href = link.value().attr("href")?;
        return Some(absolutize(href, base));
    }

    None
}

/// Resolve a possibly-relative href against the site base URL
fn absolutize(href: &str, base: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if let Some(stripped) = href.strip_prefix('/') {
        format!("{base}/{stripped}")
    } else {
        format!("{base}/{href}")
    }
}

/// Derive the feed candidate for a Medium source
///
/// Profiles on medium.com map to `/feed/@user`, publications to
/// `/feed/<publication>`. Publications on custom domains map through
/// the first host label, which is how Medium names their feeds.
pub fn medium_feed_candidate(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;

    if host == "medium.com" || host == "www.medium.com" {
        let segment = parsed.path_segments()?.find(|s| !s.is_empty())?;
        return Some(format!("https://medium.com/feed/{segment}"));
    }

    let label = host.split('.').next()?;
    if label.is_empty() {
        return None;
    }
    Some(format!("https://medium.com/feed/{label}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_medium_profile_candidate() {
        assert_eq!(
            medium_feed_candidate("https://medium.com/@writer").as_deref(),
            Some("https://medium.com/feed/@writer")
        );
    }

    #[test]
    fn test_medium_publication_candidate() {
        assert_eq!(
            medium_feed_candidate("https://medium.com/some-pub").as_deref(),
            Some("https://medium.com/feed/some-pub")
        );
    }

    #[test]
    fn test_medium_custom_domain_candidate() {
        assert_eq!(
            medium_feed_candidate("https://ai.gopubby.com").as_deref(),
            Some("https://medium.com/feed/ai")
        );
    }

    #[test]
    fn test_medium_invalid_url() {
        assert!(medium_feed_candidate("not a url").is_none());
    }

    #[test]
    fn test_find_alternate_link_absolute() {
        let html = r#"<html><head>
            <link rel="alternate" type="application/rss+xml" href="https://example.com/custom.xml">
        </head><body></body></html>"#;

        assert_eq!(
            find_alternate_link(html, "https://example.com").as_deref(),
            Some("https://example.com/custom.xml")
        );
    }

    #[test]
    fn test_find_alternate_link_relative() {
        let html = r#"<html><head>
            <link rel="alternate" type="application/atom+xml" href="/atom.xml">
        </head></html>"#;

        assert_eq!(
            find_alternate_link(html, "https://example.com").as_deref(),
            Some("https://example.com/atom.xml")
        );
    }

    #[test]
    fn test_ignores_non_feed_alternates() {
        let html = r#"<html><head>
            <link rel="alternate" type="application/json" href="/feed.json">
            <link rel="stylesheet" href="/style.css">
        </head></html>"#;

        assert!(find_alternate_link(html, "https://example.com").is_none());
    }

    #[test]
    fn test_probe_order_starts_with_feed() {
        assert_eq!(PROBE_PATHS[0], "/feed");
        assert!(PROBE_PATHS.contains(&"/atom.xml"));
    }
}
