use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "qfetch")]
#[command(author, version, about = "Cached client for a remote analytical query engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a query through the result cache
    Query {
        /// SQL query to execute
        sql: String,

        /// Maximum cache age in hours before the result is re-fetched
        #[arg(long)]
        max_age_hours: Option<u64>,

        /// Bypass the cache and fetch fresh results
        #[arg(short, long)]
        refresh: bool,

        /// Execution environment (local, platform)
        #[arg(short, long, default_value = "local")]
        mode: String,

        /// Output format (table, json, csv)
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Cache directory override
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },

    /// Inspect cached query results
    CacheInfo {
        /// Inspect a specific entry by its hash id, with sample rows
        #[arg(long)]
        inspect: Option<String>,

        /// Show column names and types for each entry
        #[arg(long)]
        schema: bool,

        /// Limit schema output to the first N entries
        #[arg(long)]
        sample: Option<usize>,

        /// Cache directory override
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },

    /// Delete cached results under a directory tree
    CacheClear {
        /// Only clear entries older than this many hours
        #[arg(long)]
        older_than: Option<u64>,

        /// Directory tree to search for cache directories
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Cache directory name to look for
        #[arg(long)]
        cache_dir_name: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let config = if let Some(config_path) = cli.config {
        Config::from_file(&config_path)?
    } else {
        Config::default()
    };

    match cli.command {
        Commands::Query {
            sql,
            max_age_hours,
            refresh,
            mode,
            output,
            cache_dir,
        } => {
            commands::run_query(
                &config,
                &sql,
                max_age_hours,
                refresh,
                &mode,
                &output,
                cache_dir,
            )
            .await?;
        }
        Commands::CacheInfo {
            inspect,
            schema,
            sample,
            cache_dir,
        } => {
            commands::cache_info(&config, inspect.as_deref(), schema, sample, cache_dir)?;
        }
        Commands::CacheClear {
            older_than,
            root,
            cache_dir_name,
            yes,
        } => {
            commands::cache_clear(&config, &root, cache_dir_name.as_deref(), older_than, yes)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        "qfetch_cli=debug,qfetch_cache=debug,qfetch_flight=debug"
    } else {
        "qfetch_cli=info,qfetch_cache=info,qfetch_flight=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}
