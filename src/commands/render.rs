//! Render stage: write the static page from summarized items

use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::render::Renderer;
use crate::storage::Store;

/// Run the render stage once, returning the written page path
pub async fn run(config: &Config) -> anyhow::Result<PathBuf> {
    let store = Store::open(&config.database.path)?;
    let rows = store.recent_summarized(config.render.max_items)?;

    info!(count = rows.len(), "Rendering summarized items");

    let renderer = Renderer::new(&config.render.output_dir)?;
    let path = renderer.write_index(&rows)?;
    Ok(path)
}
