//! # drive-ingest CLI (`ingest`)
//!
//! ## Usage
//!
//! ```bash
//! ingest --config ./config/ingest.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ingest run` | Incrementally ingest new and modified files |
//! | `ingest query "<text>"` | Semantic search over the index |
//! | `ingest status` | Summarize the manifest and index |
//! | `ingest check` | Verify secrets, source listing, and index dimension |
//!
//! Command output goes to stdout; logs and progress go to stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use drive_ingest::config;
use drive_ingest::ingest::{self, RunOptions};
use drive_ingest::progress::ProgressMode;
use drive_ingest::query::{self, QueryArgs};
use drive_ingest::{check, logging, status};

/// Incremental Google Drive → vector index ingestion.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ingest.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ingest",
    about = "Incrementally ingest Google Drive documents into a vector index",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ingest.toml")]
    config: PathBuf,

    /// Progress on stderr: off, human, or json. Defaults to human when
    /// stderr is a terminal.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest new and modified files.
    ///
    /// Lists the source, skips files whose fingerprint matches the
    /// manifest, and fetches, windows, embeds and upserts the rest.
    Run {
        /// Ignore the manifest and reprocess every file.
        #[arg(long)]
        full: bool,

        /// List, classify and window only. Nothing is embedded or written.
        #[arg(long)]
        dry_run: bool,

        /// Process at most N changed files.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Query the index.
    Query {
        /// Natural-language query text.
        text: String,

        /// Number of matches to return.
        #[arg(long, default_value_t = 5)]
        top_k: usize,

        /// Metadata equality filter, e.g. `--filter content_type=pdf`.
        /// Repeatable.
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Print an assembled chat context of at most N characters instead
        /// of the match list.
        #[arg(long)]
        context_chars: Option<usize>,
    },

    /// Show manifest and index statistics.
    Status,

    /// Verify configuration, secrets, source access and index dimension.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    match cli.command {
        Commands::Run {
            full,
            dry_run,
            limit,
        } => {
            let options = RunOptions {
                full,
                dry_run,
                limit,
            };
            ingest::run_ingest(&cfg, options, progress).await?;
        }
        Commands::Query {
            text,
            top_k,
            filters,
            context_chars,
        } => {
            query::run_query(
                &cfg,
                QueryArgs {
                    text,
                    top_k,
                    filters,
                    context_chars,
                },
            )
            .await?;
        }
        Commands::Status => {
            status::run_status(&cfg).await?;
        }
        Commands::Check => {
            check::run_check(&cfg).await?;
        }
    }

    Ok(())
}
