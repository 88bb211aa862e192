
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};
use url::Url;

use super::{Config, ConfigError, OllamaConfig, QdrantConfig};
use crate::http::join_endpoint;

const CONNECTION_TEST_TIMEOUT_SECONDS: u64 = 5;

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Vault Search Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Qdrant Configuration").bold().yellow());
    eprintln!("Configure the Qdrant instance that stores document vectors.");
    eprintln!();
    configure_qdrant(&mut config.qdrant)?;

    eprintln!();
    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Configure the Ollama instance used for embeddings and answers.");
    eprintln!();
    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    report_connection("Qdrant", probe(&config.qdrant.url, "/collections"));
    report_connection("Ollama", probe(&config.ollama.url, "/api/tags"));

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

/// Print the effective configuration, after environment overrides
#[inline]
pub fn show_config(config: &Config) {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Server:").bold().yellow());
    eprintln!("  Bind: {}", style(&config.server.bind).cyan());
    eprintln!(
        "  Max Upload: {} bytes",
        style(config.server.max_upload_bytes).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Qdrant:").bold().yellow());
    eprintln!("  URL: {}", style(&config.qdrant.url).cyan());
    eprintln!("  Collection: {}", style(&config.qdrant.collection).cyan());
    eprintln!(
        "  Scroll Page Size: {}",
        style(config.qdrant.scroll_page_size).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Ollama:").bold().yellow());
    eprintln!("  URL: {}", style(&config.ollama.url).cyan());
    eprintln!(
        "  Embedding Model: {} ({} dimensions)",
        style(&config.ollama.embedding_model).cyan(),
        config.ollama.embedding_dimension
    );
    eprintln!("  Chat Model: {}", style(&config.ollama.chat_model).cyan());
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!(
        "  Chunk Size: {} (overlap {})",
        style(config.chunking.chunk_size).cyan(),
        config.chunking.chunk_overlap
    );
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    if config_dir.join("config.toml").exists() {
        let config = Config::load(config_dir)?;
        eprintln!("{}", style("Found existing configuration.").green());
        Ok(config)
    } else {
        eprintln!(
            "{}",
            style("No existing configuration found. Using defaults.").yellow()
        );
        Ok(Config {
            base_dir: config_dir.to_path_buf(),
            ..Config::default()
        })
    }
}

fn configure_qdrant(qdrant: &mut QdrantConfig) -> Result<()> {
    let url: String = Input::new()
        .with_prompt("Qdrant URL")
        .default(qdrant.url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            QdrantConfig {
                url: input.clone(),
                ..QdrantConfig::default()
            }
            .validate()
        })
        .interact_text()?;

    let collection: String = Input::new()
        .with_prompt("Collection name")
        .default(qdrant.collection.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Collection name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    qdrant.url = url;
    qdrant.collection = collection;
    Ok(())
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let url: String = Input::new()
        .with_prompt("Ollama URL")
        .default(ollama.url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            OllamaConfig::default().set_url(input.clone())
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.embedding_model.clone())
        .interact_text()?;

    let chat_model: String = Input::new()
        .with_prompt("Chat model")
        .default(ollama.chat_model.clone())
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(ollama.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.set_url(url)?;
    ollama.set_embedding_model(embedding_model)?;
    ollama.set_chat_model(chat_model)?;
    ollama.batch_size = batch_size;

    Ok(())
}

fn report_connection(service: &str, reachable: bool) {
    if reachable {
        eprintln!("{}", style(format!("✓ {} connection successful!", service)).green());
    } else {
        eprintln!(
            "{}",
            style(format!("⚠ Warning: Could not connect to {}", service)).yellow()
        );
        eprintln!(
            "You can continue, but make sure {} is running before serving.",
            service
        );
    }
}

/// Returns true when the server at `base` answers `path` at all; 4xx still proves it is up
fn probe(base: &str, path: &str) -> bool {
    let Ok(url) = Url::parse(base).and_then(|base| join_endpoint(&base, path)) else {
        return false;
    };

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(CONNECTION_TEST_TIMEOUT_SECONDS)))
        .build()
        .into();

    match agent.get(url.as_str()).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) => (400..500).contains(&code),
        Err(_) => false,
    }
}
