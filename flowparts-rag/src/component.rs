//! Component boundary: typed inputs in, a result or a single error string out.
//!
//! Inside the crate every failure is a [`RagError`]. At this boundary it is
//! rendered once, with a fixed per-component prefix, into a [`ReportedError`].
//! A caller never receives a partial result alongside an error.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::aggregate::IngestTable;
use crate::error::RagError;
use crate::loader::FileInput;
use crate::pipeline::RagPipeline;
use crate::retriever::DocumentRetriever;
#[cfg(all(feature = "pinecone", feature = "postgres"))]
use crate::config::Credentials;
#[cfg(all(feature = "openai", feature = "pinecone", feature = "postgres"))]
use crate::config::RagConfig;

/// Prefix for errors reported by [`IngestComponent`].
pub const INGEST_ERROR_PREFIX: &str = "Error during processing and indexing";

/// Prefix for errors reported by [`RetrieverComponent`].
pub const RETRIEVE_ERROR_PREFIX: &str = "Error retrieving document";

/// A failure rendered for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedError(pub String);

impl ReportedError {
    fn new(prefix: &str, err: &RagError) -> Self {
        Self(format!("{prefix}: {err}"))
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ReportedError {}

/// The outcome of running a component.
pub type ComponentResult<T> = std::result::Result<T, ReportedError>;

/// Input fields of the ingestion component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestInput {
    pub files: Vec<FileInput>,
    /// Must be a JSON object with the required metadata fields.
    pub metadata: Value,
    #[serde(default)]
    pub namespace: String,
}

/// Input fields of the retrieval component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrieveInput {
    pub file_id: String,
    #[serde(default)]
    pub namespace: String,
}

/// Loads, validates and indexes files, returning the result table.
pub struct IngestComponent {
    pipeline: Arc<RagPipeline>,
}

impl IngestComponent {
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        Self { pipeline }
    }

    /// Connect the full remote stack; setup failures carry the ingestion prefix.
    #[cfg(all(feature = "openai", feature = "pinecone", feature = "postgres"))]
    pub async fn connect(
        credentials: &Credentials,
        index_name: &str,
        config: RagConfig,
    ) -> ComponentResult<Self> {
        match RagPipeline::connect(credentials, index_name, config).await {
            Ok(pipeline) => Ok(Self::new(Arc::new(pipeline))),
            Err(e) => {
                let reported = ReportedError::new(INGEST_ERROR_PREFIX, &e);
                error!(index = index_name, error = %reported, "ingestion setup failed");
                Err(reported)
            }
        }
    }

    pub async fn run(&self, input: IngestInput) -> ComponentResult<IngestTable> {
        self.pipeline.ingest(&input.namespace, &input.files, &input.metadata).await.map_err(|e| {
            let reported = ReportedError::new(INGEST_ERROR_PREFIX, &e);
            error!(error = %reported, "ingestion failed");
            reported
        })
    }
}

/// Retrieves a stored document's text by key.
pub struct RetrieverComponent {
    retriever: Arc<DocumentRetriever>,
}

impl RetrieverComponent {
    pub fn new(retriever: Arc<DocumentRetriever>) -> Self {
        Self { retriever }
    }

    /// Share the retriever of an existing pipeline.
    pub fn from_pipeline(pipeline: &RagPipeline) -> Self {
        Self::new(Arc::clone(pipeline.retriever()))
    }

    /// Connect only the vector index and the document store; setup failures
    /// carry the retrieval prefix.
    #[cfg(all(feature = "pinecone", feature = "postgres"))]
    pub async fn connect(credentials: &Credentials, index_name: &str) -> ComponentResult<Self> {
        match DocumentRetriever::connect(credentials, index_name).await {
            Ok(retriever) => Ok(Self::new(Arc::new(retriever))),
            Err(e) => {
                let reported = ReportedError::new(RETRIEVE_ERROR_PREFIX, &e);
                error!(index = index_name, error = %reported, "retrieval setup failed");
                Err(reported)
            }
        }
    }

    pub async fn run(&self, input: RetrieveInput) -> ComponentResult<String> {
        self.retriever.retrieve(&input.namespace, &input.file_id).await.map_err(|e| {
            let reported = ReportedError::new(RETRIEVE_ERROR_PREFIX, &e);
            error!(file_id = %input.file_id, error = %reported, "retrieval failed");
            reported
        })
    }
}
