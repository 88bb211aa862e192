use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vault_search::commands::{ask, delete_document, ingest_files, list_documents, serve};
use vault_search::config::{get_config_dir, load_effective, run_interactive_config, show_config};

const DEFAULT_LOG_FILTER: &str = "vault_search=info,tower_http=info";

#[derive(Parser)]
#[command(name = "vault-search")]
#[command(about = "Ask cited questions over a private vault of PDF documents")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to the platform config directory)
    #[arg(long, global = true, env = "VAULT_SEARCH_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Qdrant and Ollama connections
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Start the HTTP API
    Serve {
        /// Address to listen on, e.g. 0.0.0.0:8000
        #[arg(long)]
        bind: Option<String>,
    },
    /// Ingest one or more PDF files
    Ingest {
        /// PDF files to ingest
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Drop and recreate the collection before ingesting
        #[arg(long)]
        recreate: bool,
    },
    /// List ingested documents
    List,
    /// Delete a document and all of its chunks
    Delete {
        /// Filename the document was ingested under
        filename: String,
    },
    /// Ask a question and stream a cited answer
    Ask {
        /// The question to answer
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let config_dir = get_config_dir(cli.config_dir)?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&load_effective(config_dir)?);
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Serve { bind } => {
            let mut config = load_effective(config_dir)?;
            if let Some(bind) = bind {
                config.server.bind = bind;
                config.server.validate()?;
            }
            serve(&config).await?;
        }
        Commands::Ingest { paths, recreate } => {
            ingest_files(&load_effective(config_dir)?, &paths, recreate).await?;
        }
        Commands::List => {
            list_documents(&load_effective(config_dir)?).await?;
        }
        Commands::Delete { filename } => {
            delete_document(&load_effective(config_dir)?, &filename).await?;
        }
        Commands::Ask { question } => {
            ask(&load_effective(config_dir)?, &question).await?;
        }
    }

    Ok(())
}
