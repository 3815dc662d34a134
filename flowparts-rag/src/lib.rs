//! # flowparts-rag
//!
//! Document ingestion and filtered retrieval over a vector index and a
//! separate document store.
//!
//! ## Overview
//!
//! Uploading runs metadata validation, file loading, a dual write per
//! document (chunk nodes into the vector index, the full body into the
//! document store) and result aggregation. Retrieval queries the vector index
//! for nodes whose back-relationship equals a document key and follows that
//! relationship into the document store.
//!
//! - [`RagPipeline`] - builder-configured orchestrator for both flows
//! - [`IngestComponent`] / [`RetrieverComponent`] - boundary types that
//!   report failures as a single prefixed message
//! - [`InMemoryVectorStore`] / [`InMemoryDocumentStore`] - in-process backends
//!
//! ## Features
//!
//! | Feature    | Enables                                       |
//! |------------|-----------------------------------------------|
//! | `openai`   | [`openai::OpenAIEmbeddingProvider`] (default) |
//! | `pinecone` | [`pinecone::PineconeVectorStore`] (default)   |
//! | `postgres` | `postgres::PgDocumentStore`                   |
//! | `full`     | all of the above                              |

pub mod aggregate;
pub mod chunking;
pub mod component;
pub mod config;
pub mod docstore;
pub mod document;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod inmemory;
pub mod loader;
pub mod metadata;
pub mod pipeline;
pub mod retriever;
pub mod vectorstore;
pub mod writer;

#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "pinecone")]
pub mod pinecone;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use aggregate::{IngestFailure, IngestRow, IngestTable};
pub use chunking::{Chunker, FixedSizeChunker, WholeDocumentChunker};
pub use component::{
    ComponentResult, IngestComponent, IngestInput, ReportedError, RetrieveInput,
    RetrieverComponent,
};
pub use config::{ChunkingStrategy, Credentials, RagConfig, RagConfigBuilder};
pub use docstore::DocumentStore;
pub use document::{Chunk, Document, Metadata};
pub use embedding::EmbeddingProvider;
pub use error::{MetadataViolation, RagError, Result};
pub use filter::{FilterCondition, FilterOperator, MetadataFilter, MetadataFilters};
pub use inmemory::{InMemoryDocumentStore, InMemoryVectorStore};
pub use loader::{DocumentLoader, FileInput, LoadFailure, LoadReport};
pub use metadata::{DocumentMetadata, validate_metadata, validate_metadata_value};
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use retriever::DocumentRetriever;
pub use vectorstore::VectorStore;
pub use writer::{IndexWriter, WriteOutcome};
