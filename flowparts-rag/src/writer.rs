//! The embedding and index writer.
//!
//! For each document the writer performs two independent writes: chunk,
//! embed and upsert into the vector store, and a put of the full document into
//! the document store. They run concurrently and each reports its own
//! result. Nothing is rolled back; if the vector write lands and the document
//! write fails, the index holds chunk nodes whose back-relationship does not
//! resolve, and retrieval of that key fails with
//! [`RagError::NotFound`](crate::RagError::NotFound).

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use crate::chunking::Chunker;
use crate::docstore::DocumentStore;
use crate::document::{Chunk, Document};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// The result of writing one document to both stores.
#[derive(Debug)]
pub struct WriteOutcome {
    /// The key of the document that was written.
    pub document_id: String,
    /// Number of chunk nodes upserted, or the vector-side failure.
    pub vector: Result<usize>,
    /// The document-store write result.
    pub docstore: Result<()>,
}

impl WriteOutcome {
    /// Both writes succeeded.
    pub fn is_success(&self) -> bool {
        self.vector.is_ok() && self.docstore.is_ok()
    }

    /// Chunk nodes were written but the document they point at was not.
    pub fn is_dangling(&self) -> bool {
        matches!(self.vector, Ok(n) if n > 0) && self.docstore.is_err()
    }

    /// Collapse both results into one, preferring the vector-side error.
    pub fn into_result(self) -> Result<usize> {
        let dangling = self.is_dangling();
        match (self.vector, self.docstore) {
            (Ok(count), Ok(())) => Ok(count),
            (Err(e), _) => Err(e),
            (Ok(_), Err(RagError::RemoteCall { service, message })) if dangling => {
                Err(RagError::RemoteCall {
                    service,
                    message: format!(
                        "{message} (vector index now references missing document '{}')",
                        self.document_id
                    ),
                })
            }
            (Ok(_), Err(e)) => Err(e),
        }
    }
}

/// Writes documents into a vector store namespace and a document store.
pub struct IndexWriter {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    document_store: Arc<dyn DocumentStore>,
    chunker: Arc<dyn Chunker>,
    max_concurrency: usize,
}

impl IndexWriter {
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        document_store: Arc<dyn DocumentStore>,
        chunker: Arc<dyn Chunker>,
    ) -> Self {
        Self { embedding_provider, vector_store, document_store, chunker, max_concurrency: 1 }
    }

    /// Set how many documents [`write_batch`](Self::write_batch) writes at once.
    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }

    /// Write one document to both stores.
    ///
    /// A document that yields no chunks could never be retrieved by key, so
    /// neither write is attempted and both sides report a load failure.
    pub async fn write(&self, namespace: &str, document: &Document) -> WriteOutcome {
        let chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            warn!(document.id = %document.id, "document has no text to index");
            let empty = || RagError::Load {
                path: document.source_path.clone().unwrap_or_else(|| document.id.clone().into()),
                message: "document has no text to index".into(),
            };
            return WriteOutcome {
                document_id: document.id.clone(),
                vector: Err(empty()),
                docstore: Err(empty()),
            };
        }

        let (vector, docstore) = tokio::join!(
            self.write_vectors(namespace, &document.id, chunks),
            self.document_store.put(document),
        );

        let outcome = WriteOutcome { document_id: document.id.clone(), vector, docstore };
        match (&outcome.vector, &outcome.docstore) {
            (Ok(chunk_count), Ok(())) => {
                info!(document.id = %document.id, chunk_count, namespace, "indexed document");
            }
            (_, Err(e)) if outcome.is_dangling() => {
                error!(
                    document.id = %document.id,
                    error = %e,
                    "document store write failed after vector write; relationship is dangling"
                );
            }
            (vector, docstore) => {
                warn!(
                    document.id = %document.id,
                    vector_error = ?vector.as_ref().err(),
                    docstore_error = ?docstore.as_ref().err(),
                    "document write failed"
                );
            }
        }
        outcome
    }

    /// Write a batch of documents, at most `max_concurrency` at a time.
    ///
    /// Outcomes are returned in input order. A failing document never stops
    /// the others.
    pub async fn write_batch(&self, namespace: &str, documents: &[Document]) -> Vec<WriteOutcome> {
        stream::iter(documents)
            .map(|document| self.write(namespace, document))
            .buffered(self.max_concurrency)
            .collect()
            .await
    }

    async fn write_vectors(
        &self,
        namespace: &str,
        document_id: &str,
        mut chunks: Vec<Chunk>,
    ) -> Result<usize> {
        self.embedding_provider.embed_chunks(&mut chunks).await.map_err(|e| {
            error!(document.id = %document_id, error = %e, "embedding failed during ingestion");
            e
        })?;

        self.vector_store.upsert(namespace, &chunks).await.map_err(|e| {
            error!(document.id = %document_id, error = %e, "upsert failed during ingestion");
            e
        })?;

        Ok(chunks.len())
    }
}
