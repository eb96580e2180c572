use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nemdb_core::{Config, DateRange, Filesystem, NemwebDb};

/// Mirrors National Electricity Market publications into a local cache.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Downloads every active table over a date range.
    Populate {
        /// Cache directory to write the datasets to.
        #[arg(short, long)]
        location: Option<PathBuf>,

        /// Storage backend; only "local" is supported.
        #[arg(short, long, default_value = "local")]
        filesystem: Filesystem,

        /// Range to fetch, as "YYYY-MM-DD->YYYY-MM-DD".
        #[arg(short, long)]
        date_range: DateRange,

        /// Comma-separated table names; defaults to all active tables.
        #[arg(short, long, value_delimiter = ',')]
        tables: Vec<String>,

        /// Re-download months that are already present.
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Populate {
            location,
            filesystem,
            date_range,
            tables,
            force,
        } => {
            let config = match location {
                Some(dir) => Config::new(dir, filesystem),
                None => Config::load(None)?,
            };
            info!(
                location = %config.cache_dir.display(),
                from = %date_range.start,
                to = %date_range.end,
                "fetching data"
            );
            let db = NemwebDb::new(config)?;
            let selection = if tables.is_empty() {
                None
            } else {
                Some(tables.as_slice())
            };
            db.populate(&date_range, force, selection)?;
        }
    }
    Ok(())
}
