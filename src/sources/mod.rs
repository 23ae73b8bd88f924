//! Declarative source list
//!
//! Sources are declared in a TOML file as `[[sources]]` entries, loaded
//! once per run and upserted into the store before ingestion:
//!
//! ```toml
//! [[sources]]
//! name = "Example Substack"
//! url = "https://example.substack.com/"
//! kind = "substack"
//!
//! [[sources]]
//! name = "Some Channel"
//! url = "https://www.youtube.com/@somechannel"
//! kind = "youtube"
//! feed_url = "https://www.youtube.com/feeds/videos.xml?channel_id=UC123"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::models::SourceKind;

/// One entry in the declarative source list
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub url: String,

    /// Feed kind; defaults to `site` when omitted
    #[serde(default = "default_kind", alias = "type")]
    pub kind: SourceKind,

    /// Pre-resolved feed location. When present it is authoritative and
    /// type-derived discovery is skipped.
    #[serde(default)]
    pub feed_url: Option<String>,
}

fn default_kind() -> SourceKind {
    SourceKind::Site
}

/// The parsed source list
#[derive(Debug, Default, Deserialize)]
pub struct SourceList {
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

impl SourceList {
    /// Load and parse the source list from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read source list: {}", path.display()))?;

        let list: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse source list: {}", path.display()))?;

        Ok(list)
    }
}
