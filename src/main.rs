use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gleaner::config::Config;

#[derive(Parser)]
#[command(
    name = "gleaner",
    version,
    about = "Feed ingestion and LLM summarization pipeline",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    /// Optional TOML config file; environment variables otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch feeds and ingest new items
    Fetch {
        /// Override the source list path
        #[arg(short, long)]
        sources: Option<PathBuf>,

        /// Override the database path
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Summarize pending items with the configured LLM provider
    Summarize {
        /// Override the per-run item cap
        #[arg(short, long)]
        limit: Option<usize>,

        /// Override the database path
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Render the static page from summarized items
    Render {
        /// Override the output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the number of items displayed
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show store counts
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    match cli.command {
        Commands::Fetch { sources, db } => {
            if let Some(sources) = sources {
                config.sources.path = sources;
            }
            if let Some(db) = db {
                config.database.path = db;
            }
            config.validate()?;

            let stats = gleaner::commands::fetch::run(&config).await?;
            println!(
                "Fetch done: {} new items from {} sources ({} not modified, {} deactivated)",
                stats.items_inserted,
                stats.sources_processed,
                stats.feeds_not_modified,
                stats.sources_deactivated
            );
        }

        Commands::Summarize { limit, db } => {
            if let Some(limit) = limit {
                config.summarize.max_items_per_run = limit;
            }
            if let Some(db) = db {
                config.database.path = db;
            }
            config.validate()?;

            let stats = gleaner::commands::summarize::run(&config).await?;
            println!(
                "Summarize done: {} succeeded, {} failed ({} selected)",
                stats.summarized, stats.failed, stats.selected
            );
        }

        Commands::Render { output, limit } => {
            if let Some(output) = output {
                config.render.output_dir = output;
            }
            if let Some(limit) = limit {
                config.render.max_items = limit;
            }
            config.validate()?;

            let path = gleaner::commands::render::run(&config).await?;
            println!("Rendered {}", path.display());
        }

        Commands::Status => {
            gleaner::commands::status::run(&config).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("gleaner=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("gleaner=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    Ok(())
}
