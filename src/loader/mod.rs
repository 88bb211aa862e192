// PDF document loader
// Produces one text record per page, numbered from 0

#[cfg(test)]
mod tests;

use std::path::Path;

use lopdf::Document;
use tracing::{debug, warn};

use crate::{Result, VaultError};

/// Text extracted from a single PDF page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 0-based page index, as shown in citations
    pub number: u32,
    pub text: String,
}

/// Load a PDF from disk and extract the text of every page in order.
///
/// Pages whose text cannot be decoded are returned with empty text so page
/// numbering stays intact.
#[inline]
pub fn load_pdf(path: &Path) -> Result<Vec<Page>> {
    if !path.exists() {
        return Err(VaultError::NotFound(format!(
            "file {} does not exist",
            path.display()
        )));
    }

    let document = Document::load(path).map_err(|e| {
        VaultError::InvalidInput(format!("{} is not a readable PDF: {}", path.display(), e))
    })?;

    if document.is_encrypted() {
        return Err(VaultError::InvalidInput(format!(
            "{} is encrypted",
            path.display()
        )));
    }

    let pages = extract_pages(&document, path);
    debug!("Loaded {} pages from {}", pages.len(), path.display());
    Ok(pages)
}

fn extract_pages(document: &Document, path: &Path) -> Vec<Page> {
    document
        .get_pages()
        .into_keys()
        .map(|page_number| {
            let text = document.extract_text(&[page_number]).unwrap_or_else(|e| {
                warn!(
                    "Could not extract text from page {} of {}: {}",
                    page_number,
                    path.display(),
                    e
                );
                String::new()
            });
            Page {
                number: page_number.saturating_sub(1),
                text,
            }
        })
        .collect()
}
