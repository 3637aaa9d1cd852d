//! # ossfinder CLI
//!
//! Entry point for the search portal backend. The same binary runs the
//! HTTP service and provides one-off operational commands against the
//! search engine.
//!
//! ## Usage
//!
//! ```bash
//! ossfinder --config ./config/ossfinder.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ossfinder serve` | Bootstrap the collection and run the HTTP service |
//! | `ossfinder init` | Ensure the collection exists, then exit |
//! | `ossfinder search "<query>"` | One-off search, print the engine JSON |
//! | `ossfinder upload <file>` | Index a JSON array of documents from a file |
//! | `ossfinder health` | Probe the engine and print its status |

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use ossfinder::config::{self, Config};
use ossfinder::gateway::SearchGateway;
use ossfinder::mailer::SmtpMailer;
use ossfinder::models::RepoDocument;
use ossfinder::server::{self, AppState};

/// Search portal backend for indexed open-source projects.
#[derive(Parser)]
#[command(
    name = "ossfinder",
    about = "Search portal backend for indexed open-source projects",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ossfinder.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service.
    ///
    /// Ensures the search collection exists first; startup fails if the
    /// engine stays unavailable past the configured retries.
    Serve,

    /// Ensure the search collection exists, then exit.
    ///
    /// Idempotent — an existing collection is left untouched.
    Init,

    /// Run a one-off search and print the engine's JSON response.
    Search {
        /// The search query string.
        query: String,
    },

    /// Index documents from a JSON file (an array of document objects).
    Upload {
        /// Path to the JSON file.
        file: PathBuf,
    },

    /// Probe the search engine and print its health status.
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            let gateway = bootstrap_gateway(&cfg).await?;
            let mailer = Arc::new(SmtpMailer::new(&cfg.smtp)?);
            let state = AppState {
                config: Arc::new(cfg),
                gateway,
                mailer,
            };
            server::run_server(state).await?;
        }
        Commands::Init => {
            bootstrap_gateway(&cfg).await?;
            println!("Collection '{}' ready.", cfg.typesense.collection);
        }
        Commands::Search { query } => {
            let gateway = SearchGateway::new(cfg.typesense.clone())?;
            let results = gateway.search(&query).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Upload { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let documents: Vec<RepoDocument> =
                serde_json::from_str(&content).context("Expected a JSON array of documents")?;

            let gateway = SearchGateway::new(cfg.typesense.clone())?;
            let summary = gateway.index_batch(&documents).await;
            println!(
                "indexed: {}, skipped: {}, failed: {}",
                summary.indexed, summary.skipped, summary.failed
            );
        }
        Commands::Health => {
            let gateway = SearchGateway::new(cfg.typesense.clone())?;
            let ok = gateway.health().await;
            println!("{}", serde_json::json!({ "ok": ok }));
            if !ok {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Build the gateway and run the fatal-on-failure collection bootstrap.
async fn bootstrap_gateway(cfg: &Config) -> anyhow::Result<Arc<SearchGateway>> {
    let gateway = Arc::new(SearchGateway::new(cfg.typesense.clone())?);
    gateway
        .ensure_collection()
        .await
        .context("Search collection bootstrap failed")?;
    gateway.health().await;
    Ok(gateway)
}
