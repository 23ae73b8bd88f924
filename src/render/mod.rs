//! Static page rendering
//!
//! Downstream consumer of the store: reads the most recent summarized
//! items and writes a standalone HTML page. Handlebars escapes all
//! interpolated values, so no summary or title content reaches the page
//! unescaped. A malformed summary payload renders as empty fields rather
//! than failing the page.

use chrono::Utc;
use handlebars::Handlebars;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::Item;
use crate::summarize::schema::Summary;

/// Default page template
const INDEX_TEMPLATE: &str = include_str!("../../templates/index.hbs");

/// Template data for one rendered item
#[derive(Debug, Serialize)]
struct ItemView {
    title: String,
    url: String,
    source_name: String,
    date: String,
    eli5: String,
    eli16: String,
    why_this_matters: String,
    what_changed: String,
    key_quotes: Vec<String>,
    confidence_unknowns: String,
}

/// Template data for the full page
#[derive(Debug, Serialize)]
struct PageView {
    updated: String,
    count: usize,
    items: Vec<ItemView>,
}

/// HTML page renderer with a Handlebars template
pub struct Renderer<'a> {
    handlebars: Handlebars<'a>,
    output_dir: PathBuf,
}

impl<'a> Renderer<'a> {
    /// Create a renderer writing into `output_dir`
    pub fn new(output_dir: &Path) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars
            .register_template_string("index", INDEX_TEMPLATE)
            .map_err(|e| Error::config(format!("failed to register index template: {e}")))?;

        fs::create_dir_all(output_dir)?;

        Ok(Self {
            handlebars,
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Render the page for the given summarized rows
    pub fn render_page(&self, rows: &[(Item, String)]) -> Result<String> {
        let page = PageView {
            updated: Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
            count: rows.len(),
            items: rows.iter().map(item_view).collect(),
        };

        Ok(self.handlebars.render("index", &page)?)
    }

    /// Render and write `index.html`, returning its path
    pub fn write_index(&self, rows: &[(Item, String)]) -> Result<PathBuf> {
        let html = self.render_page(rows)?;
        let path = self.output_dir.join("index.html");
        fs::write(&path, &html)?;

        info!(path = %path.display(), bytes = html.len(), "Wrote index page");
        Ok(path)
    }
}

fn item_view((item, source_name): &(Item, String)) -> ItemView {
    let summary = item
        .summary_json
        .as_deref()
        .and_then(|json| serde_json::from_str::<Summary>(json).ok());

    if summary.is_none() {
        warn!(item_id = item.id, "Summarized item has unparseable payload");
    }

    let date = item
        .published_at
        .map(|dt| dt.format("%b %d, %Y").to_string())
        .unwrap_or_else(|| String::from("Unknown date"));

    match summary {
        Some(s) => ItemView {
            title: item.title.clone(),
            url: item.url.clone(),
            source_name: source_name.clone(),
            date,
            eli5: s.eli5,
            eli16: s.eli16,
            why_this_matters: s.why_this_matters,
            what_changed: s.what_changed,
            key_quotes: s.key_quotes.unwrap_or_default(),
            confidence_unknowns: s.confidence_unknowns,
        },
        None => ItemView {
            title: item.title.clone(),
            url: item.url.clone(),
            source_name: source_name.clone(),
            date,
            eli5: String::new(),
            eli16: String::new(),
            why_this_matters: String::new(),
            what_changed: String::new(),
            key_quotes: Vec::new(),
            confidence_unknowns: String::new(),
        },
    }
}
