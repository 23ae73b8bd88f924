//! Status command: store counts for operator visibility

use crate::config::Config;
use crate::storage::Store;

/// Print store-wide counts
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let store = Store::open(&config.database.path)?;
    let stats = store.stats()?;

    println!("Store status");
    println!("============");
    println!("Database: {}", config.database.path.display());
    println!(
        "Sources: {} ({} active)",
        stats.sources_total, stats.sources_active
    );
    println!("Items: {}", stats.items_total);
    println!("  new:        {}", stats.items_new);
    println!("  summarized: {}", stats.items_summarized);

    Ok(())
}
