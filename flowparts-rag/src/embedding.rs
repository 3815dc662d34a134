//! Turning chunk text into vectors.
//!
//! Backends implement [`EmbeddingProvider::embed_batch`] and report their
//! output width through [`dimensions`](EmbeddingProvider::dimensions). The
//! writer only calls [`embed_chunks`](EmbeddingProvider::embed_chunks), which
//! refuses to fill chunks from a response of the wrong shape: a vector index
//! rejects mismatched widths, and a short response would silently leave
//! chunks unembedded.

use async_trait::async_trait;

use crate::document::Chunk;
use crate::error::{RagError, Result};

const SERVICE: &str = "embedding backend";

/// Source of fixed-width embedding vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts; vectors come back in input order.
    ///
    /// Falls back to one [`embed`](Self::embed) call per text.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Width of every vector this provider returns.
    fn dimensions(&self) -> usize;

    /// Embed the text of every chunk in one batch and store each vector on
    /// its chunk.
    ///
    /// Chunks are left untouched unless the batch returns exactly one vector
    /// per chunk, each [`dimensions`](Self::dimensions) wide.
    async fn embed_chunks(&self, chunks: &mut [Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(RagError::remote(
                SERVICE,
                format!("expected {} embeddings, got {}", chunks.len(), embeddings.len()),
            ));
        }
        let expected = self.dimensions();
        if let Some((i, bad)) = embeddings.iter().enumerate().find(|(_, e)| e.len() != expected) {
            return Err(RagError::remote(
                SERVICE,
                format!(
                    "embedding for chunk '{}' has {} dimensions, expected {expected}",
                    chunks[i].id,
                    bad.len()
                ),
            ));
        }

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }
        Ok(())
    }
}
