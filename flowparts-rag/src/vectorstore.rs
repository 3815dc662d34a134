//! Vector store trait for storing chunk nodes and selecting them by metadata.

use async_trait::async_trait;

use crate::document::Chunk;
use crate::error::Result;
use crate::filter::MetadataFilters;

/// A vector index partitioned into namespaces.
///
/// An implementation is bound to one named index when it is constructed;
/// every call names the namespace it targets. Writing into a namespace that
/// does not exist yet creates it.
///
/// # Example
///
/// ```rust,ignore
/// use flowparts_rag::{InMemoryVectorStore, MetadataFilters, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.upsert("clients", &chunks).await?;
/// let nodes = store.get_nodes("clients", &MetadataFilters::for_document("doc1"), 10).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upsert chunks into a namespace. Chunks must have embeddings set.
    async fn upsert(&self, namespace: &str, chunks: &[Chunk]) -> Result<()>;

    /// Return up to `limit` nodes whose metadata satisfies `filters`.
    ///
    /// Results come back in whatever order the backend provides; callers
    /// must not assume any ranking among them.
    async fn get_nodes(
        &self,
        namespace: &str,
        filters: &MetadataFilters,
        limit: usize,
    ) -> Result<Vec<Chunk>>;

    /// Delete chunks by their IDs from a namespace.
    async fn delete(&self, namespace: &str, ids: &[&str]) -> Result<()>;
}
