//! Content extraction
//!
//! Turns a feed entry into a normalized item draft. Embedded feed content
//! is preferred; when it is missing or trivially short the entry's own
//! page is fetched and run through heuristic main-content extraction.
//! Extraction is best-effort by design: a failed page fetch still yields
//! a draft with whatever partial excerpt is available, because the dedup
//! store protects against reprocessing either way.

pub mod sanitize;

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::feed::FeedEntry;
use crate::fetch::FetchClient;
use crate::models::ItemDraft;
use sanitize::{clip, has_content, sanitize_text};

/// Embedded feed content shorter than this is treated as trivial and
/// triggers the page-fetch fallback
const TRIVIAL_CONTENT_CHARS: usize = 100;

static CONTENT_ROOT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "main, article, [class*='post'], [class*='content'], [class*='entry'], [class*='article']",
    )
    .unwrap()
});

static PARAGRAPH_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p, h1, h2, h3, h4, li, blockquote, pre").unwrap());

static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// Produces item drafts from feed entries
pub struct ContentExtractor<'a> {
    client: &'a FetchClient,
    max_chars: usize,
}

impl<'a> ContentExtractor<'a> {
    pub fn new(client: &'a FetchClient, max_chars: usize) -> Self {
        Self { client, max_chars }
    }

    /// Build a draft for one feed entry
    ///
    /// Never fails: the worst case is a draft with an empty excerpt.
    pub async fn extract(&self, source_id: i64, entry: &FeedEntry) -> ItemDraft {
        let mut text = entry
            .content_html
            .as_deref()
            .map(extract_text_from_html)
            .filter(|t| has_content(t))
            .or_else(|| {
                entry
                    .summary_html
                    .as_deref()
                    .map(extract_text_from_html)
                    .filter(|t| has_content(t))
            })
            .unwrap_or_default();

        if text.chars().count() < TRIVIAL_CONTENT_CHARS {
            debug!(url = %entry.url, "Embedded content trivial, fetching entry page");
            match self.client.get(&entry.url).await {
                Ok(page) => {
                    let page_text = extract_text_from_html(&page);
                    if page_text.chars().count() > text.chars().count() {
                        text = page_text;
                    }
                }
                Err(e) => {
                    // partial content beats silent loss
                    warn!(url = %entry.url, error = %e, "Entry page fetch failed, keeping partial excerpt");
                }
            }
        }

        ItemDraft {
            source_id,
            title: entry.title.clone(),
            url: entry.url.clone(),
            guid: entry.guid.clone(),
            published_at: entry.published_at,
            content_text: clip(&text, self.max_chars),
        }
    }
}

/// Heuristic main-content extraction from page markup
///
/// Locates the most likely content container (`main`, `article`, or a
/// class-hinted block, falling back to `body`), then keeps paragraph-level
/// text. Script, style, and navigation chrome never match the paragraph
/// selector, so boilerplate drops out without DOM surgery.
pub fn extract_text_from_html(html: &str) -> String {
    let document = Html::parse_document(html);

    let root = document
        .select(&CONTENT_ROOT_SELECTOR)
        .next()
        .or_else(|| document.select(&BODY_SELECTOR).next());

    let root = match root {
        Some(el) => el,
        None => return sanitize_text(html),
    };

    let paragraphs = collect_paragraphs(root);
    if !paragraphs.is_empty() {
        return sanitize_text(&paragraphs.join("\n"));
    }

    // no paragraph-level markup; take the container's raw text
    sanitize_text(&root.text().collect::<Vec<_>>().join(" "))
}

fn collect_paragraphs(root: ElementRef<'_>) -> Vec<String> {
    root.select(&PARAGRAPH_SELECTOR)
        .map(|el| el.text().collect::<String>())
        .filter(|t| has_content(t))
        .collect()
}
