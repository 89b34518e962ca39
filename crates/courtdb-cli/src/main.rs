mod apply;
mod catalog;
mod discover;
mod import;
mod repair;
mod validate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "courtdb")]
#[command(about = "Venue discovery and booking-link maintenance")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Find venues in the configured places and discover their booking pages
    Discover {
        /// Only scan places with this name (repeatable; default: all places)
        #[arg(long = "place")]
        places: Vec<String>,
        /// Write accepted venues to this tabular file instead of the store
        #[arg(long)]
        output: Option<PathBuf>,
        /// Maximum concurrent site crawls
        #[arg(long)]
        concurrency: Option<usize>,
        /// Stop after this many candidates with a website
        #[arg(long)]
        limit: Option<usize>,
        /// Print what would be inserted without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Insert venues from a tabular file into the store
    Import {
        /// Tabular file laid out with the venue export header
        #[arg(long)]
        input: PathBuf,
        /// Number of upserts between progress log lines
        #[arg(long, default_value = "50")]
        batch_size: usize,
        /// Print what would be inserted without writing to the store
        #[arg(long)]
        dry_run: bool,
    },
    /// Resolve every stored booking URL and report the failures
    Validate {
        /// Validate a tabular file instead of the store catalog
        #[arg(long)]
        input: Option<PathBuf>,
        /// Directory for the report and corrected export
        #[arg(long, default_value = "reports")]
        output_dir: PathBuf,
        /// Maximum concurrent link checks
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Search for replacement booking pages for a validation report's failures
    Repair {
        /// Validation report written by `validate`
        #[arg(long)]
        report: PathBuf,
        /// Directory for the fixed-links export and repair report
        #[arg(long, default_value = "reports")]
        output_dir: PathBuf,
        /// Maximum concurrent site crawls
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Write a repair report's new booking URLs to the store
    Apply {
        /// Repair report written by `repair`
        #[arg(long)]
        fixes: PathBuf,
        /// Print intended updates without writing to the store
        #[arg(long)]
        dry_run: bool,
    },
    /// Export the store catalog to a tabular file
    Export {
        #[arg(long)]
        output: PathBuf,
    },
    /// Remove catalog rows that share a booking URL, keeping the lowest id
    Dedupe {
        /// Delete the duplicates (default: only list them)
        #[arg(long)]
        apply: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = courtdb_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Discover {
            places,
            output,
            concurrency,
            limit,
            dry_run,
        }) => {
            discover::run_discover(
                &config,
                &discover::DiscoverArgs {
                    places,
                    output,
                    concurrency,
                    limit,
                    dry_run,
                },
            )
            .await?;
        }
        Some(Commands::Import {
            input,
            batch_size,
            dry_run,
        }) => import::run_import(&config, &input, batch_size, dry_run).await?,
        Some(Commands::Validate {
            input,
            output_dir,
            concurrency,
        }) => {
            validate::run_validate(&config, input.as_deref(), &output_dir, concurrency).await?;
        }
        Some(Commands::Repair {
            report,
            output_dir,
            concurrency,
        }) => repair::run_repair(&config, &report, &output_dir, concurrency).await?,
        Some(Commands::Apply { fixes, dry_run }) => {
            apply::run_apply(&config, &fixes, dry_run).await?;
        }
        Some(Commands::Export { output }) => catalog::run_export(&config, &output).await?,
        Some(Commands::Dedupe { apply }) => catalog::run_dedupe(&config, apply).await?,
        None => println!("courtdb: no command given (try --help)"),
    }

    Ok(())
}
