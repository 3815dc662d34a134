//! Filtered retrieval of a full document by its key.
//!
//! Retrieval joins the two stores: a metadata-filtered query selects the chunk
//! nodes whose back-relationship equals the key, and the first node's
//! [`document_id`](crate::Chunk::document_id) is then looked up in the
//! document store.
//!
//! ```text
//! Start ─ query index ─┬─ no nodes ───────────────────────── NotFound(chunk)
//!                      └─ first node ─ lookup document ─┬─ missing ─ NotFound(document)
//!                                                       └─ found ─── Done(text)
//! ```

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::MAX_NODES;
use crate::docstore::DocumentStore;
use crate::document::Document;
use crate::error::{RagError, Result};
use crate::filter::MetadataFilters;
use crate::vectorstore::VectorStore;
#[cfg(all(feature = "pinecone", feature = "postgres"))]
use crate::{config::Credentials, pinecone::PineconeVectorStore, postgres::PgDocumentStore};

/// Retrieves stored documents through the vector index.
pub struct DocumentRetriever {
    vector_store: Arc<dyn VectorStore>,
    document_store: Arc<dyn DocumentStore>,
    max_nodes: usize,
}

impl DocumentRetriever {
    pub fn new(vector_store: Arc<dyn VectorStore>, document_store: Arc<dyn DocumentStore>) -> Self {
        Self { vector_store, document_store, max_nodes: 100 }
    }

    /// Cap the number of nodes the filtered query fetches, within `1..=MAX_NODES`.
    pub fn with_max_nodes(mut self, n: usize) -> Self {
        self.max_nodes = n.clamp(1, MAX_NODES);
        self
    }

    /// Retrieve the full document stored under `file_id`.
    ///
    /// When several chunk nodes share the key, the first one in the order
    /// returned by the vector store is followed.
    ///
    /// # Errors
    ///
    /// - [`RagError::NotFound`] with `what = "chunk"` if no node matches.
    /// - [`RagError::NotFound`] with `what = "document"` if the node's
    ///   relationship does not resolve in the document store.
    /// - [`RagError::RemoteCall`] if either store fails.
    pub async fn retrieve_document(&self, namespace: &str, file_id: &str) -> Result<Document> {
        let filters = MetadataFilters::for_document(file_id);
        let nodes = self.vector_store.get_nodes(namespace, &filters, self.max_nodes).await?;

        let Some(node) = nodes.into_iter().next() else {
            warn!(file_id, namespace, "no chunk nodes matched");
            return Err(RagError::NotFound { what: "chunk", key: file_id.to_string() });
        };
        debug!(
            file_id,
            chunk.id = %node.id,
            document.id = %node.document_id,
            "following relationship"
        );

        if node.document_id.is_empty() {
            warn!(file_id, chunk.id = %node.id, "chunk node has no document relationship");
            return Err(RagError::NotFound { what: "document", key: file_id.to_string() });
        }

        let document = self.document_store.get(&node.document_id).await?.ok_or_else(|| {
            warn!(
                file_id,
                document.id = %node.document_id,
                "relationship points to a missing document"
            );
            RagError::NotFound { what: "document", key: node.document_id.clone() }
        })?;

        info!(
            file_id,
            file_path = document.file_path().unwrap_or_default(),
            "successfully retrieved document"
        );
        Ok(document)
    }

    /// Build a retriever over a Pinecone index and a Postgres document store.
    ///
    /// Needs only `PINECONE_API_KEY` and `DOCSTORE_URL`. The document store
    /// connects on the first lookup and no table is created.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a credential is missing or malformed,
    /// and [`RagError::RemoteCall`] if the index cannot be described.
    #[cfg(all(feature = "pinecone", feature = "postgres"))]
    pub async fn connect(credentials: &Credentials, index_name: &str) -> Result<Self> {
        let docstore_url = Credentials::require(&credentials.docstore_url, "DOCSTORE_URL")?;
        let document_store = PgDocumentStore::connect_lazy(docstore_url)?;
        let vector_store = PineconeVectorStore::from_credentials(credentials, index_name).await?;
        Ok(Self::new(Arc::new(vector_store), Arc::new(document_store)))
    }

    /// Retrieve only the text body of the document stored under `file_id`.
    ///
    /// # Errors
    ///
    /// Same as [`retrieve_document`](Self::retrieve_document).
    pub async fn retrieve(&self, namespace: &str, file_id: &str) -> Result<String> {
        self.retrieve_document(namespace, file_id).await.map(|document| document.text)
    }
}
