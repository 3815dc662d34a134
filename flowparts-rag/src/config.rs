//! Configuration for ingestion and retrieval.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chunking::{Chunker, FixedSizeChunker, WholeDocumentChunker};
use crate::error::{RagError, Result};

/// How documents are split into chunk nodes before embedding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ChunkingStrategy {
    /// One chunk per document.
    #[default]
    WholeDocument,
    /// Fixed character windows with overlap.
    FixedSize { size: usize, overlap: usize },
}

impl ChunkingStrategy {
    /// Build the [`Chunker`] for this strategy.
    pub fn chunker(&self) -> Arc<dyn Chunker> {
        match *self {
            Self::WholeDocument => Arc::new(WholeDocumentChunker),
            Self::FixedSize { size, overlap } => Arc::new(FixedSizeChunker::new(size, overlap)),
        }
    }
}

/// Configuration parameters for the ingestion and retrieval components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// How documents are chunked.
    pub chunking: ChunkingStrategy,
    /// Maximum documents written concurrently within a batch.
    pub max_concurrency: usize,
    /// Maximum chunk nodes fetched by a filtered retrieval query.
    pub max_nodes: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { chunking: ChunkingStrategy::WholeDocument, max_concurrency: 4, max_nodes: 100 }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Upper bound on [`RagConfig::max_nodes`]; Pinecone rejects a larger `topK`
/// when metadata is requested.
pub const MAX_NODES: usize = 1000;

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the chunking strategy.
    pub fn chunking(mut self, chunking: ChunkingStrategy) -> Self {
        self.config.chunking = chunking;
        self
    }

    /// Set the maximum number of documents written concurrently.
    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.config.max_concurrency = n;
        self
    }

    /// Set the maximum number of nodes a retrieval query fetches.
    pub fn max_nodes(mut self, n: usize) -> Self {
        self.config.max_nodes = n;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - a fixed-size strategy has `size == 0` or `overlap >= size`
    /// - `max_concurrency == 0`
    /// - `max_nodes` is zero or above [`MAX_NODES`]
    pub fn build(self) -> Result<RagConfig> {
        if let ChunkingStrategy::FixedSize { size, overlap } = self.config.chunking {
            if size == 0 {
                return Err(RagError::Config("chunk size must be greater than zero".to_string()));
            }
            if overlap >= size {
                return Err(RagError::Config(format!(
                    "chunk overlap ({overlap}) must be less than chunk size ({size})"
                )));
            }
        }
        if self.config.max_concurrency == 0 {
            return Err(RagError::Config("max_concurrency must be greater than zero".to_string()));
        }
        if self.config.max_nodes == 0 || self.config.max_nodes > MAX_NODES {
            return Err(RagError::Config(format!(
                "max_nodes must be between 1 and {MAX_NODES}, got {}",
                self.config.max_nodes
            )));
        }
        Ok(self.config)
    }
}

/// Credentials and endpoints for the external services.
///
/// Built once per request and handed to the constructors of each client.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub pinecone_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Connection URL for the document store database.
    pub docstore_url: Option<String>,
    /// Pinecone control plane used to resolve index hosts. Defaults to the
    /// public endpoint.
    #[serde(default)]
    pub pinecone_control_plane_url: Option<String>,
    /// Optional per-request timeout for HTTP backends.
    #[serde(default, with = "optional_secs")]
    pub request_timeout: Option<Duration>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("Credentials")
            .field("pinecone_api_key", &redact(&self.pinecone_api_key))
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("docstore_url", &redact(&self.docstore_url))
            .field("pinecone_control_plane_url", &self.pinecone_control_plane_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Credentials {
    /// Read `PINECONE_API_KEY`, `OPENAI_API_KEY`, `DOCSTORE_URL`,
    /// `PINECONE_CONTROL_PLANE_URL` and `FLOWPARTS_REQUEST_TIMEOUT_SECS` from
    /// the environment.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            pinecone_api_key: var("PINECONE_API_KEY"),
            openai_api_key: var("OPENAI_API_KEY"),
            docstore_url: var("DOCSTORE_URL"),
            pinecone_control_plane_url: var("PINECONE_CONTROL_PLANE_URL"),
            request_timeout: var("FLOWPARTS_REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs),
        }
    }

    /// Return a required credential or a [`RagError::Config`] naming it.
    pub fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
        value.as_deref().ok_or_else(|| RagError::Config(format!("{name} is required")))
    }
}

mod optional_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}
