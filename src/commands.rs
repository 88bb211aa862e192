use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::style;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::config::Config;
use crate::pipeline::VaultService;

/// Start the HTTP API
#[inline]
pub async fn serve(config: &Config) -> Result<()> {
    crate::server::serve(config).await
}

/// Ingest local PDF files, optionally wiping the collection first.
///
/// Every file is attempted; the command fails afterwards if any file failed.
#[inline]
pub async fn ingest_files(config: &Config, paths: &[PathBuf], recreate: bool) -> Result<()> {
    let service = VaultService::from_config(config).context("Failed to initialize services")?;

    if recreate {
        service
            .recreate_collection()
            .await
            .context("Failed to recreate collection")?;
        println!(
            "{} Recreated collection {}",
            style("⚠").yellow(),
            config.qdrant.collection
        );
    }

    let progress = ProgressBar::new(paths.len() as u64).with_style(
        ProgressStyle::with_template("{spinner} [{pos}/{len}] Ingesting {msg}")
            .context("Invalid progress template")?,
    );

    let mut total_chunks = 0usize;
    let mut failures = Vec::new();

    for path in paths {
        let source = source_name(path);
        progress.set_message(source.clone());

        match service.ingest_file(path, &source).await {
            Ok(chunks) => {
                total_chunks += chunks;
                progress.println(format!(
                    "{} {} ({} chunks)",
                    style("✓").green(),
                    source,
                    chunks
                ));
            }
            Err(e) => {
                error!("Failed to ingest {}: {}", path.display(), e);
                progress.println(format!("{} {}: {}", style("✗").red(), source, e));
                failures.push(source);
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    println!(
        "Ingested {} of {} files, {} chunks stored",
        paths.len() - failures.len(),
        paths.len(),
        total_chunks
    );

    if failures.is_empty() {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{} file(s) failed to ingest: {}",
            failures.len(),
            failures.join(", ")
        ))
    }
}

/// List ingested documents
#[inline]
pub async fn list_documents(config: &Config) -> Result<()> {
    let service = VaultService::from_config(config).context("Failed to initialize services")?;
    let documents = service.list_documents().await;

    if documents.is_empty() {
        println!("No documents have been ingested yet.");
        println!("Use 'vault-search ingest <file.pdf>' to add one.");
        return Ok(());
    }

    println!("Documents ({} total):", documents.len());
    for document in &documents {
        println!("📄 {}", document);
    }

    Ok(())
}

/// Delete every chunk of a document
#[inline]
pub async fn delete_document(config: &Config, filename: &str) -> Result<()> {
    let service = VaultService::from_config(config).context("Failed to initialize services")?;
    service
        .delete_document(filename)
        .await
        .with_context(|| format!("Failed to delete {}", filename))?;

    println!("{} Deleted {}", style("✓").green(), filename);
    Ok(())
}

/// Ask a question and print the answer as it streams in
#[inline]
pub async fn ask(config: &Config, question: &str) -> Result<()> {
    let service = VaultService::from_config(config).context("Failed to initialize services")?;
    let mut tokens = service
        .answer(question)
        .await
        .context("Failed to start answering")?;

    let mut stdout = std::io::stdout();
    while let Some(token) = tokens.next().await {
        let token = token.context("Answer stream failed")?;
        stdout.write_all(token.as_bytes())?;
        stdout.flush()?;
    }
    writeln!(stdout)?;

    info!("Answer complete");
    Ok(())
}

/// File name used as the chunk source for a local path
fn source_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_name_is_final_component() {
        assert_eq!(source_name(Path::new("/data/vault/policy.pdf")), "policy.pdf");
        assert_eq!(source_name(Path::new("report.pdf")), "report.pdf");
    }
}
