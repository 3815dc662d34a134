//! Ingestion and retrieval pipeline orchestrator.
//!
//! The [`RagPipeline`] composes an [`EmbeddingProvider`], a [`VectorStore`]
//! and a [`DocumentStore`] and exposes the two request-scoped flows:
//!
//! - ingestion: validate → load → write (per document, concurrently) → aggregate
//! - retrieval: filtered node lookup → document lookup → text
//!
//! # Example
//!
//! ```rust,ignore
//! use flowparts_rag::{InMemoryDocumentStore, InMemoryVectorStore, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .document_store(Arc::new(InMemoryDocumentStore::new()))
//!     .build()?;
//!
//! let table = pipeline.ingest("clients", &files, &metadata).await?;
//! let text = pipeline.retrieve("clients", "doc1").await?;
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::aggregate::{IngestTable, aggregate, record_load_failures};
use crate::config::RagConfig;
use crate::docstore::DocumentStore;
use crate::document::Document;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::loader::{DocumentLoader, FileInput};
use crate::metadata::{validate_metadata, validate_metadata_value};
use crate::retriever::DocumentRetriever;
use crate::vectorstore::VectorStore;
use crate::writer::IndexWriter;
#[cfg(all(feature = "openai", feature = "pinecone", feature = "postgres"))]
use crate::{
    config::Credentials, openai::OpenAIEmbeddingProvider, pinecone::PineconeVectorStore,
    postgres::PgDocumentStore,
};

/// The ingestion and retrieval pipeline.
///
/// Construct one via [`RagPipeline::builder()`]. All collaborators are
/// supplied explicitly; the pipeline holds no global client state.
pub struct RagPipeline {
    config: RagConfig,
    loader: DocumentLoader,
    writer: IndexWriter,
    retriever: Arc<DocumentRetriever>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return the index writer.
    pub fn writer(&self) -> &IndexWriter {
        &self.writer
    }

    /// Return the document retriever.
    pub fn retriever(&self) -> &Arc<DocumentRetriever> {
        &self.retriever
    }

    /// Build a pipeline over OpenAI embeddings, a Pinecone index and a
    /// Postgres document store, using only the given credentials.
    ///
    /// The document store table is created if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a credential is missing or the index
    /// dimensions do not match the embedding model, and
    /// [`RagError::RemoteCall`] if a backend cannot be reached.
    #[cfg(all(feature = "openai", feature = "pinecone", feature = "postgres"))]
    pub async fn connect(
        credentials: &Credentials,
        index_name: &str,
        config: RagConfig,
    ) -> Result<Self> {
        let openai_key = Credentials::require(&credentials.openai_api_key, "OPENAI_API_KEY")?;
        let docstore_url = Credentials::require(&credentials.docstore_url, "DOCSTORE_URL")?;

        let mut embedder = OpenAIEmbeddingProvider::new(openai_key)?;
        if let Some(timeout) = credentials.request_timeout {
            embedder = embedder.with_timeout(timeout)?;
        }
        let vector_store = PineconeVectorStore::from_credentials(credentials, index_name).await?;
        if embedder.dimensions() != vector_store.dimensions() {
            return Err(RagError::Config(format!(
                "index '{index_name}' has {} dimensions but the embedding model produces {}",
                vector_store.dimensions(),
                embedder.dimensions()
            )));
        }

        let document_store = PgDocumentStore::new(docstore_url).await?;
        document_store.ensure_table().await?;

        Self::builder()
            .config(config)
            .embedding_provider(Arc::new(embedder))
            .vector_store(Arc::new(vector_store))
            .document_store(Arc::new(document_store))
            .build()
    }

    /// Ingest a batch of files into `namespace`.
    ///
    /// The metadata is validated once, before any file is read or any
    /// network call is made. The loader lets user metadata win every key
    /// collision, so each merged document mapping keeps the validated fields.
    /// Failures of individual files or documents are recorded in the table's
    /// failures and never abort the batch.
    ///
    /// # Errors
    ///
    /// - [`RagError::Validation`] if the batch metadata is invalid.
    /// - [`RagError::Load`] if `files` is empty.
    pub async fn ingest(
        &self,
        namespace: &str,
        files: &[FileInput],
        metadata: &Value,
    ) -> Result<IngestTable> {
        let metadata = validate_metadata_value(metadata)?.into_map();
        let report = self.loader.load(files, &metadata).await?;
        let documents = report.documents;

        info!(
            namespace,
            documents = documents.len(),
            load_failures = report.failures.len(),
            "indexing documents"
        );
        let outcomes = self.writer.write_batch(namespace, &documents).await;
        let dangling = outcomes.iter().filter(|o| o.is_dangling()).count();
        if dangling > 0 {
            warn!(namespace, dangling, "some documents are indexed without a stored body");
        }

        let mut table =
            aggregate(documents.into_iter().zip(outcomes.into_iter().map(|o| o.into_result())));
        record_load_failures(&mut table, report.failures);

        info!(
            namespace,
            rows = table.rows.len(),
            failures = table.failures.len(),
            "ingestion completed"
        );
        Ok(table)
    }

    /// Write already-built documents into `namespace`, skipping file loading.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] for the first document whose metadata
    /// is invalid; nothing is written in that case.
    pub async fn ingest_documents(
        &self,
        namespace: &str,
        documents: Vec<Document>,
    ) -> Result<IngestTable> {
        for document in &documents {
            validate_metadata(&document.metadata)?;
        }
        let outcomes = self.writer.write_batch(namespace, &documents).await;
        Ok(aggregate(documents.into_iter().zip(outcomes.into_iter().map(|o| o.into_result()))))
    }

    /// Retrieve the text of the document stored under `file_id`.
    ///
    /// # Errors
    ///
    /// See [`DocumentRetriever::retrieve_document`].
    pub async fn retrieve(&self, namespace: &str, file_id: &str) -> Result<String> {
        self.retriever.retrieve(namespace, file_id).await
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config` defaults to [`RagConfig::default()`]; the three collaborators
/// are required.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    document_store: Option<Arc<dyn DocumentStore>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document store backend.
    pub fn document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.document_store = Some(store);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if any required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;
        let document_store = self
            .document_store
            .ok_or_else(|| RagError::Config("document_store is required".to_string()))?;

        let writer = IndexWriter::new(
            embedding_provider,
            Arc::clone(&vector_store),
            Arc::clone(&document_store),
            config.chunking.chunker(),
        )
        .with_max_concurrency(config.max_concurrency);
        let retriever = Arc::new(
            DocumentRetriever::new(vector_store, document_store).with_max_nodes(config.max_nodes),
        );

        Ok(RagPipeline { config, loader: DocumentLoader::new(), writer, retriever })
    }
}
