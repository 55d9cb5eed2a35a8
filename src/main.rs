//! # docqa CLI
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa setup` | Create the index (if missing) and ingest the documents directory |
//! | `docqa ask "<question>"` | Answer a question from the indexed documents |
//! | `docqa serve` | Start the HTTP server |
//! | `docqa indexes` | List indexes in the vector store |
//!
//! `OPENAI_API_KEY` and `PINECONE_API_KEY` must be set in the environment.
//! Log verbosity follows `RUST_LOG`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docqa::config;
use docqa::pipeline::{run_ask, run_setup};
use docqa::server;
use docqa::services::Services;

/// Question answering over a local documents directory.
#[derive(Parser)]
#[command(name = "docqa", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the index and load every document into it.
    ///
    /// Safe to re-run: an existing index is reused and records are
    /// replaced by id.
    Setup,

    /// Answer a question using the top matching chunks.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// List indexes known to the vector store.
    Indexes,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("docqa=info,docqa_core=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Setup => {
            let services = Services::from_config(&cfg)?;
            let report = run_setup(&cfg, &services).await?;
            let status = match report.index_status {
                docqa::provision::IndexStatus::Created => "created",
                docqa::provision::IndexStatus::AlreadyExists => "already existed",
            };
            println!("Index {} {}.", report.index, status);
            println!(
                "Documents: {} ({} empty), chunks: {}, vectors upserted: {} in {} batches",
                report.stats.documents,
                report.stats.skipped_empty,
                report.stats.chunks,
                report.stats.vectors_upserted,
                report.stats.upsert_batches
            );
        }
        Commands::Ask { question } => {
            if question.trim().is_empty() {
                anyhow::bail!("question must not be empty");
            }
            let services = Services::from_config(&cfg)?;
            match run_ask(&cfg, &services, question.trim()).await? {
                Some(answer) => println!("{}", answer),
                None => println!("No matches found."),
            }
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Indexes => {
            let services = Services::from_config(&cfg)?;
            let indexes = services.store.list_indexes().await?;
            if indexes.is_empty() {
                println!("No indexes.");
            }
            for idx in indexes {
                println!(
                    "{:<24} dim={:<6} metric={:<10} {}",
                    idx.name,
                    idx.dimension,
                    idx.metric.to_string(),
                    if idx.ready { "ready" } else { "initializing" }
                );
            }
        }
    }

    Ok(())
}
