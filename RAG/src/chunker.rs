use crate::error::ConfigError;
use crate::models::*;
use uuid::Uuid;

/// Fixed-size character windows with a constant overlap between neighbours.
///
/// Sizes are counted in Unicode scalar values, so a window never splits a
/// multi-byte character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(ConfigError::InvalidChunking {
                size: chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// `(start, end)` character ranges of every window over a text of
    /// `total` characters.
    pub fn windows(&self, total: usize) -> Vec<(usize, usize)> {
        let step = self.chunk_size - self.overlap;
        let mut windows = Vec::new();
        if total == 0 {
            return windows;
        }

        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(total);
            windows.push((start, end));
            if end == total {
                break;
            }
            start += step;
        }
        windows
    }

    pub fn chunk_document(&self, doc: &Document) -> Vec<DocumentChunk> {
        let bounds = char_bounds(&doc.text);

        self.windows(bounds.len() - 1)
            .into_iter()
            .enumerate()
            .map(|(position, (start, end))| DocumentChunk {
                id: chunk_id(doc.row, position),
                content: doc.text[bounds[start]..bounds[end]].to_string(),
                metadata: doc.metadata.clone(),
            })
            .collect()
    }

    /// Flattens all documents into one ordered chunk sequence.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<DocumentChunk> {
        let chunks: Vec<DocumentChunk> = documents
            .iter()
            .flat_map(|doc| self.chunk_document(doc))
            .collect();

        log::info!(
            "Created {} chunks from {} documents (size {}, overlap {})",
            chunks.len(),
            documents.len(),
            self.chunk_size,
            self.overlap
        );
        chunks
    }
}

/// Byte offset of every char boundary, including the end of the string.
fn char_bounds(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(text.len()))
        .collect()
}

/// Stable across runs so re-upserting a batch overwrites instead of duplicating.
fn chunk_id(row: usize, position: usize) -> String {
    let name = format!("intake-row-{}-chunk-{}", row, position);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}
