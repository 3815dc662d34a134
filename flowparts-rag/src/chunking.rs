//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`WholeDocumentChunker`] - one chunk per document
//! - [`FixedSizeChunker`] - splits by character count with configurable overlap

use serde_json::Value;

use crate::document::{CHUNK_INDEX_KEY, Chunk, DOCUMENT_ID_KEY, Document};

/// A strategy for splitting documents into chunk nodes.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later by the index writer. Every chunk carries the
/// back-relationship to its document both as [`Chunk::document_id`] and as the
/// `document_id` metadata field, which is what filtered retrieval matches on.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

fn make_chunk(document: &Document, index: usize, text: String) -> Chunk {
    let mut metadata = document.metadata.clone();
    metadata.insert(CHUNK_INDEX_KEY.to_string(), Value::from(index));
    metadata.insert(DOCUMENT_ID_KEY.to_string(), Value::String(document.id.clone()));
    Chunk {
        id: format!("{}_{index}", document.id),
        text,
        embedding: Vec::new(),
        metadata,
        document_id: document.id.clone(),
    }
}

/// Emits the whole document as a single chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeDocumentChunker;

impl Chunker for WholeDocumentChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() {
            return Vec::new();
        }
        vec![make_chunk(document, 0, document.text.clone())]
    }
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`. Sizes are counted
/// in `char`s so multi-byte text is never split inside a code point.
///
/// # Example
///
/// ```rust,ignore
/// use flowparts_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(256, 50);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per chunk
    /// * `chunk_overlap` - number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() || self.chunk_size == 0 {
            return Vec::new();
        }

        // byte offset of every char, plus the end of the string
        let bounds: Vec<usize> = document
            .text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(document.text.len()))
            .collect();
        let char_count = bounds.len() - 1;
        let step = self.chunk_size.saturating_sub(self.chunk_overlap);

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < char_count {
            let end = (start + self.chunk_size).min(char_count);
            let text = document.text[bounds[start]..bounds[end]].to_string();
            chunks.push(make_chunk(document, chunks.len(), text));

            if step == 0 || end == char_count {
                break;
            }
            start += step;
        }

        chunks
    }
}
