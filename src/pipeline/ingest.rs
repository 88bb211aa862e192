use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use crate::http::run_blocking;
use crate::loader::{Page, load_pdf};
use crate::pipeline::{UPSERT_BATCH_SIZE, VaultService};
use crate::{Result, VaultError};

impl VaultService {
    /// Ingest a PDF from disk, tagging every chunk with `source`
    #[inline]
    pub async fn ingest_file(&self, path: &Path, source: &str) -> Result<usize> {
        check_source(source)?;
        let path = path.to_path_buf();
        let pages = run_blocking(move || load_pdf(&path)).await?;
        self.ingest_pages(&pages, source).await
    }

    /// Ingest uploaded PDF bytes under the final path component of `filename`.
    ///
    /// The bytes are staged in a temporary file that is removed before this
    /// returns, whether or not ingestion succeeds.
    #[inline]
    pub async fn ingest_upload(&self, filename: &str, bytes: Vec<u8>) -> Result<usize> {
        let source = upload_source_name(filename)?;
        debug!("Staging upload {} ({} bytes)", source, bytes.len());

        let pages = run_blocking(move || {
            let mut staged = tempfile::Builder::new()
                .prefix("vault-upload-")
                .suffix(".pdf")
                .tempfile()?;
            staged.write_all(&bytes)?;
            staged.flush()?;
            load_pdf(staged.path())
        })
        .await?;

        self.ingest_pages(&pages, &source).await
    }

    /// Chunk, embed and store already-extracted pages; returns the number of chunks stored
    #[inline]
    pub async fn ingest_pages(&self, pages: &[Page], source: &str) -> Result<usize> {
        check_source(source)?;

        let chunks = self.splitter.split_pages(pages, source);
        if chunks.is_empty() {
            info!("{} has no extractable text, nothing to store", source);
            return Ok(0);
        }

        self.ensure_collection().await?;

        let mut stored = 0;
        for batch in chunks.chunks(UPSERT_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let vectors = self.embedder.embed_documents(texts).await?;
            stored += self.store.add_chunks(batch.to_vec(), vectors).await?;
        }

        info!(
            "Ingested {} ({} pages, {} chunks)",
            source,
            pages.len(),
            stored
        );
        Ok(stored)
    }
}

/// Reduce an uploaded filename to its final path component.
///
/// Browsers and clients may send full paths with either separator.
#[inline]
pub fn upload_source_name(filename: &str) -> Result<String> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(VaultError::InvalidInput(format!(
            "invalid upload filename {:?}",
            filename
        )));
    }

    Ok(name.to_string())
}

fn check_source(source: &str) -> Result<()> {
    if source.trim().is_empty() {
        return Err(VaultError::InvalidInput(
            "document source name cannot be empty".to_string(),
        ));
    }
    Ok(())
}
