#[cfg(test)]
mod tests;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::loader::Page;
use crate::vector_store::{ChunkMetadata, DocumentChunk};

/// Separators tried in order: paragraph, line, sentence, word, character
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ".", " ", ""];

/// Configuration for text chunking. Sizes are measured in characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length
    pub chunk_size: usize,
    /// Maximum number of characters shared by adjacent chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Recursive character splitter.
///
/// Text is cut at the first separator (in priority order) that occurs in it.
/// Pieces that still exceed `chunk_size` are split again with the remaining
/// separators, and short pieces are merged back together into chunks of up to
/// `chunk_size` characters, carrying up to `chunk_overlap` characters of the
/// previous chunk forward.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    #[inline]
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            chunk_overlap: config.chunk_overlap.min(config.chunk_size.saturating_sub(1)),
            separators: DEFAULT_SEPARATORS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[inline]
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[inline]
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split a single text into chunks
    #[inline]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    /// Split every page of a document, tagging each chunk with `source` and its page number.
    ///
    /// Pages without text yield no chunks.
    #[inline]
    pub fn split_pages(&self, pages: &[Page], source: &str) -> Vec<DocumentChunk> {
        let mut chunks = Vec::new();

        for page in pages {
            if page.text.trim().is_empty() {
                debug!("Page {} of {} has no text, skipping", page.number, source);
                continue;
            }

            for (chunk_index, text) in self.split_text(&page.text).into_iter().enumerate() {
                chunks.push(DocumentChunk {
                    text,
                    metadata: ChunkMetadata {
                        source: source.to_string(),
                        page: page.number,
                        chunk_index: chunk_index as u32,
                    },
                });
            }
        }

        debug!(
            "Split {} pages of {} into {} chunks",
            pages.len(),
            source,
            chunks.len()
        );

        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let (separator, remaining) = pick_separator(text, separators);

        let mut final_chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                final_chunks.extend(self.merge_pieces(&pending));
                pending.clear();
            }

            if remaining.is_empty() {
                final_chunks.extend(hard_split(piece, self.chunk_size));
            } else {
                final_chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !pending.is_empty() {
            final_chunks.extend(self.merge_pieces(&pending));
        }

        final_chunks
    }

    /// Greedily join pieces into chunks, keeping a tail of the previous chunk as overlap
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total, self.chunk_size
                    );
                }

                if !window.is_empty() {
                    push_trimmed(&mut chunks, window.iter().copied().collect());

                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        let Some(front) = window.pop_front() else {
                            break;
                        };
                        total -= char_len(front);
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        if !window.is_empty() {
            push_trimmed(&mut chunks, window.iter().copied().collect());
        }

        chunks
    }
}

impl Default for TextSplitter {
    #[inline]
    fn default() -> Self {
        Self::new(&ChunkingConfig::default())
    }
}

/// First separator present in `text`; the empty separator always matches
fn pick_separator<'a>(text: &str, separators: &'a [String]) -> (&'a str, &'a [String]) {
    for (i, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return ("", &[]);
        }
        if text.contains(separator.as_str()) {
            return (separator.as_str(), &separators[i + 1..]);
        }
    }

    // Nothing matched: fall back to the last separator with no further levels
    (separators.last().map_or("", String::as_str), &[])
}

/// Split `text` at `separator`, attaching each separator to the start of the piece that follows it.
/// An empty separator splits into characters. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    let mut search_from = 0;

    while let Some(pos) = text[search_from..].find(separator) {
        let at = search_from + pos;
        if at > start {
            pieces.push(&text[start..at]);
        }
        start = at;
        search_from = at + separator.len();
    }

    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}

/// Cut `text` into consecutive windows of at most `size` characters
fn hard_split(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|window| window.iter().collect::<String>())
        .filter(|chunk| !chunk.trim().is_empty())
        .map(|chunk| chunk.trim().to_string())
        .collect()
}

fn push_trimmed(chunks: &mut Vec<String>, joined: String) {
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

#[inline]
fn char_len(text: &str) -> usize {
    text.chars().count()
}
