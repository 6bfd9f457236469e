//! # docqa CLI
//!
//! The `docqa` binary drives the document question-answering service.
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
//! | `docqa serve` | Start the JSON HTTP server |
//! | `docqa upload <path>` | Extract, chunk, embed, and store a document |
//! | `docqa ask <id> "<question>"` | Ask a question against a stored document |
//! | `docqa list` | List stored documents |
//!
//! ## Examples
//!
//! ```bash
//! # Upload a PDF (format inferred from the extension)
//! docqa upload ./handbook.pdf
//!
//! # Ask against it
//! docqa ask 018f3c9e-... "what is the vacation policy?"
//!
//! # Serve the HTTP API
//! docqa serve
//! ```

mod answer;
mod chunk;
mod config;
mod embedding;
mod error;
mod extract;
mod generation;
mod ingest;
mod models;
mod provider;
mod rank;
mod server;
mod store;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::answer::Answerer;
use crate::embedding::EmbeddingGateway;
use crate::provider::{HttpEmbedder, HttpGenerator};
use crate::store::DocumentStore;

/// docqa: retrieval-augmented question answering over uploaded documents.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Upload documents and ask questions grounded in their content",
    version,
    long_about = "docqa extracts text from uploaded documents, chunks and embeds it via an \
    external AI provider, and answers questions by ranking stored chunks against the question \
    and prompting an LLM with the best matches plus recent conversation history."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the JSON HTTP server.
    ///
    /// Binds to `[server].bind` and serves upload, ask, and listing
    /// endpoints until terminated.
    Serve,

    /// Upload a document: extract text, chunk, embed, and store it.
    Upload {
        /// Path to the file to upload.
        path: PathBuf,

        /// Format hint (`pdf`, `docx`, `txt`, `md`). Inferred from the
        /// file extension when omitted.
        #[arg(long)]
        format: Option<String>,
    },

    /// Ask a question against a stored document.
    Ask {
        /// Document id (from `upload` or `list`).
        id: String,

        /// The question text.
        question: String,
    },

    /// List stored documents with chunk and history counts.
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docqa=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Upload { path, format } => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let format = match format {
                Some(f) => f,
                None => path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_string)
                    .context("cannot infer format from extension; pass --format")?,
            };
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload")
                .to_string();

            let store = DocumentStore::open_file(&cfg.storage.path)?;
            let gateway = EmbeddingGateway::new(Box::new(HttpEmbedder::new(&cfg.embedding)?));
            let receipt = ingest::ingest_document(
                &store,
                &gateway,
                &cfg.chunking,
                &filename,
                &bytes,
                &format,
            )
            .await?;

            println!("uploaded {}", receipt.filename);
            println!("  id: {}", receipt.id);
            println!("  chunks: {}", receipt.chunk_count);
        }
        Commands::Ask { id, question } => {
            let store = Arc::new(DocumentStore::open_file(&cfg.storage.path)?);
            let gateway = Arc::new(EmbeddingGateway::new(Box::new(HttpEmbedder::new(
                &cfg.embedding,
            )?)));
            let generator = Box::new(HttpGenerator::new(&cfg.generation)?);
            let answerer = Answerer::new(store, gateway, generator, &cfg.retrieval);

            let outcome = answerer.answer(&id, &question).await?;
            println!("{}", outcome.answer);
        }
        Commands::List => {
            let store = DocumentStore::open_file(&cfg.storage.path)?;
            let summaries = store.list();
            if summaries.is_empty() {
                println!("No documents.");
                return Ok(());
            }
            for s in summaries {
                println!("{}  {}", s.id, s.filename);
                println!(
                    "    chunks: {}  questions: {}  uploaded: {}",
                    s.chunk_count,
                    s.history_count,
                    s.created_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
    }

    Ok(())
}
