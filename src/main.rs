//! # ragfile CLI
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragfile ingest <path>` | Load, split, embed and store a PDF or text file |
//! | `ragfile ingest-text --name <n> <file>` | Ingest a text file under a chosen source name |
//! | `ragfile ask "<question>"` | Answer a question from the stored chunks |
//! | `ragfile prompts` | List prompt templates |
//! | `ragfile serve` | Start the JSON HTTP API |
//!
//! Settings come from built-in defaults, an optional `--config` TOML file,
//! and environment variables (a `.env` file in the working directory is
//! loaded first).

use anyhow::Context;
use clap::{Parser, Subcommand};
use ragfile::config::resolve_config;
use ragfile::{answer, ingest, logging, server};
use ragfile_core::prompt::prompts;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ragfile",
    about = "Ask questions about a PDF or text file with retrieval-augmented generation",
    version
)]
struct Cli {
    /// Path to an optional configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a PDF (.pdf) or text (.txt, .md) file.
    Ingest {
        path: PathBuf,
    },

    /// Ingest a text file under an explicit source name.
    IngestText {
        /// Source name recorded on every chunk.
        #[arg(long)]
        name: String,

        /// File whose contents are ingested (decoded leniently as UTF-8).
        file: PathBuf,
    },

    /// Answer a question from the ingested chunks.
    Ask {
        question: String,

        /// Number of chunks to retrieve (default: retrieval.k).
        #[arg(long)]
        k: Option<usize>,

        /// Prompt template name (default: retrieval.prompt).
        #[arg(long)]
        prompt: Option<String>,
    },

    /// List the available prompt templates.
    Prompts,

    /// Start the HTTP API on server.bind.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    logging::init();

    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref()).context("failed to resolve configuration")?;

    match cli.command {
        Commands::Ingest { path } => {
            let count = ingest::ingest(&config, &path)
                .await
                .with_context(|| format!("failed to ingest {}", path.display()))?;
            println!("Ingested {} chunks from {}", count, path.display());
        }
        Commands::IngestText { name, file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let text = ragfile_core::text::decode_lenient(&bytes);
            let count = ingest::ingest_text(&config, &name, &text)
                .await
                .with_context(|| format!("failed to ingest {}", file.display()))?;
            println!("Ingested {} chunks as {}", count, name);
        }
        Commands::Ask {
            question,
            k,
            prompt,
        } => {
            let k = k.unwrap_or(config.retrieval.k);
            let prompt = prompt.unwrap_or_else(|| config.retrieval.prompt.clone());
            let record = answer::answer(&config, &question, k, &prompt).await?;

            println!("{}", record.answer);
            if !record.sources.is_empty() {
                println!();
                println!("Sources:");
                for (i, s) in record.sources.iter().enumerate() {
                    let page = s
                        .page
                        .map(|p| format!(" p.{}", p))
                        .unwrap_or_default();
                    println!("{}. {}{} [{}]", i + 1, s.source, page, s.chunk_id);
                    println!("   {}", s.preview.replace('\n', " "));
                }
            }
        }
        Commands::Prompts => {
            for p in prompts() {
                println!("{:<10} {}", p.name, p.description);
            }
        }
        Commands::Serve => {
            server::run_server(&config).await?;
        }
    }

    Ok(())
}
