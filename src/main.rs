//! # SOP Knowledge CLI (`sopkb`)
//!
//! Command-line access to the SOP knowledge service: browse the table of
//! contents, fetch and search SOPs, verify the catalog against the store,
//! and run the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! sopkb --config ./config/sopkb.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sopkb toc` | Print the formatted table of contents |
//! | `sopkb get <id>` | Resolve one SOP by id |
//! | `sopkb search "<query>"` | Search and resolve matching SOPs |
//! | `sopkb check` | Resolve every catalog entry and report failures |
//! | `sopkb serve` | Start the HTTP server |
//!
//! Logs go to stderr and are controlled by `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sop_knowledge::{catalog, check, config, get, search, server};

/// SOP knowledge service for a seller-support assistant.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/sopkb.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "sopkb",
    about = "SOP knowledge service: catalog lookup, document retrieval, and image URL resolution",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/sopkb.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the table of contents, grouped by category.
    Toc {
        /// Print catalog entries as JSON instead of markdown.
        #[arg(long)]
        json: bool,
    },

    /// Resolve one SOP by id, with fetchable image URLs.
    ///
    /// Exits with status 1 if the SOP is unknown, missing, corrupt, or the
    /// store is unavailable.
    Get {
        /// SOP id (e.g. `sop-handling-returns`).
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Search the catalog and resolve the best matches.
    Search {
        /// Free-text query.
        query: String,

        /// Maximum number of results (defaults to `[retrieval].default_limit`).
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Resolve every catalog entry and report failures.
    ///
    /// Exits with status 1 if any entry fails to resolve.
    Check,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Toc { json } => {
            catalog::run_toc(&cfg, json)?;
        }
        Commands::Get { id, json } => {
            get::run_get(&cfg, &id, json).await?;
        }
        Commands::Search { query, limit, json } => {
            search::run_search(&cfg, &query, limit, json).await?;
        }
        Commands::Check => {
            check::run_check(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
