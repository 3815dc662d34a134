//! Pinecone vector store backend.
//!
//! Provides [`PineconeVectorStore`] which implements [`VectorStore`] against
//! the Pinecone REST data plane using `reqwest`. This module is only
//! available when the `pinecone` feature is enabled.
//!
//! Chunk text is stored under the reserved `_node_text` metadata key next to
//! the chunk's own metadata, so a user field named `text` survives the round
//! trip. Pinecone only accepts strings, numbers, booleans and lists
//! of strings as metadata values; anything else is stored as a JSON string.
//!
//! # Example
//!
//! ```rust,ignore
//! use flowparts_rag::pinecone::PineconeVectorStore;
//!
//! let store = PineconeVectorStore::connect("pc-...", "quickstart").await?;
//! store.upsert("clients", &chunks).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::config::Credentials;
use crate::document::{Chunk, DOCUMENT_ID_KEY, Metadata};
use crate::error::{RagError, Result};
use crate::filter::MetadataFilters;
use crate::vectorstore::VectorStore;

/// The Pinecone control plane used to resolve index hosts.
pub const DEFAULT_CONTROL_PLANE_URL: &str = "https://api.pinecone.io";

/// The REST API version sent with every request.
const API_VERSION: &str = "2024-07";

/// Maximum vectors per upsert request.
const UPSERT_BATCH_SIZE: usize = 100;

/// Pinecone's upper bound on `topK` when metadata is included.
const MAX_TOP_K: usize = 1000;

/// Metadata key under which chunk text is stored.
pub const TEXT_KEY: &str = "_node_text";

const SERVICE: &str = "pinecone";

/// A [`VectorStore`] backed by a single [Pinecone](https://www.pinecone.io/) index.
pub struct PineconeVectorStore {
    client: reqwest::Client,
    api_key: String,
    host: String,
    dimensions: usize,
}

#[derive(Deserialize)]
struct IndexDescription {
    host: String,
    dimension: usize,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<PineconeVector<'a>>,
    namespace: &'a str,
}

#[derive(Serialize)]
struct PineconeVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: Metadata,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: Vec<f32>,
    top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    values: Vec<f32>,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [&'a str],
    namespace: &'a str,
}

impl PineconeVectorStore {
    /// Connect to a named index, resolving its host through the control plane.
    pub async fn connect(api_key: impl Into<String>, index_name: &str) -> Result<Self> {
        Self::connect_with_control_plane(api_key, index_name, DEFAULT_CONTROL_PLANE_URL).await
    }

    /// Connect to a named index using a specific control plane URL.
    pub async fn connect_with_control_plane(
        api_key: impl Into<String>,
        index_name: &str,
        control_plane_url: &str,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::Config("Pinecone API key must not be empty".into()));
        }
        let client = reqwest::Client::new();
        let url = format!("{}/indexes/{index_name}", control_plane_url.trim_end_matches('/'));
        let request = client.get(url);
        let description: IndexDescription = send(with_auth(request, &api_key))
            .await
            .map_err(|e| {
                error!(index = index_name, error = %e, "failed to describe pinecone index");
                RagError::remote(SERVICE, format!("error accessing index '{index_name}': {e}"))
            })?
            .json()
            .await
            .map_err(|e| {
                RagError::remote(SERVICE, format!("failed to parse index description: {e}"))
            })?;

        debug!(
            index = index_name,
            host = %description.host,
            dimensions = description.dimension,
            "resolved pinecone index"
        );
        Ok(Self {
            client,
            api_key,
            host: normalize_host(&description.host),
            dimensions: description.dimension,
        })
    }

    /// Connect to a named index using the key, control plane and timeout in
    /// `credentials`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `PINECONE_API_KEY` is missing and
    /// [`RagError::RemoteCall`] if the index cannot be described.
    pub async fn from_credentials(credentials: &Credentials, index_name: &str) -> Result<Self> {
        let api_key = Credentials::require(&credentials.pinecone_api_key, "PINECONE_API_KEY")?;
        let control_plane = credentials
            .pinecone_control_plane_url
            .as_deref()
            .unwrap_or(DEFAULT_CONTROL_PLANE_URL);
        let store = Self::connect_with_control_plane(api_key, index_name, control_plane).await?;
        match credentials.request_timeout {
            Some(timeout) => store.with_timeout(timeout),
            None => Ok(store),
        }
    }

    /// Use a known data-plane host directly, skipping the control plane.
    pub fn from_host(api_key: impl Into<String>, host: &str, dimensions: usize) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::Config("Pinecone API key must not be empty".into()));
        }
        if dimensions == 0 {
            return Err(RagError::Config("index dimensions must be greater than zero".into()));
        }
        Ok(Self { client: reqwest::Client::new(), api_key, host: normalize_host(host), dimensions })
    }

    /// Bound every request by the given timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(self)
    }

    /// The dimensionality of the bound index.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn post(&self, path: &str) -> RequestBuilder {
        with_auth(self.client.post(format!("{}{path}", self.host)), &self.api_key)
    }
}

fn with_auth(request: RequestBuilder, api_key: &str) -> RequestBuilder {
    request.header("Api-Key", api_key).header("X-Pinecone-API-Version", API_VERSION)
}

async fn send(request: RequestBuilder) -> Result<reqwest::Response> {
    let response = request
        .send()
        .await
        .map_err(|e| RagError::remote(SERVICE, format!("request failed: {e}")))?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(RagError::remote(SERVICE, format!("API returned {status}: {body}")));
    }
    Ok(response)
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

/// Convert a metadata value into one Pinecone can store, or drop it.
fn to_pinecone_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(_) | Value::Number(_) | Value::Bool(_) => Some(value.clone()),
        Value::Array(items) if items.iter().all(Value::is_string) => Some(value.clone()),
        other => Some(Value::String(other.to_string())),
    }
}

fn chunk_metadata(chunk: &Chunk) -> Metadata {
    let mut metadata: Metadata = chunk
        .metadata
        .iter()
        .filter_map(|(k, v)| to_pinecone_value(v).map(|v| (k.clone(), v)))
        .collect();
    metadata.insert(TEXT_KEY.into(), Value::String(chunk.text.clone()));
    metadata.insert(DOCUMENT_ID_KEY.into(), Value::String(chunk.document_id.clone()));
    metadata
}

fn match_to_chunk(m: QueryMatch) -> Chunk {
    let mut metadata = m.metadata;
    let text = match metadata.remove(TEXT_KEY) {
        Some(Value::String(text)) => text,
        _ => String::new(),
    };
    let document_id =
        metadata.get(DOCUMENT_ID_KEY).and_then(Value::as_str).unwrap_or_default().to_string();
    Chunk { id: m.id, text, embedding: m.values, metadata, document_id }
}

#[async_trait]
impl VectorStore for PineconeVectorStore {
    async fn upsert(&self, namespace: &str, chunks: &[Chunk]) -> Result<()> {
        for batch in chunks.chunks(UPSERT_BATCH_SIZE) {
            let vectors = batch
                .iter()
                .map(|chunk| PineconeVector {
                    id: &chunk.id,
                    values: &chunk.embedding,
                    metadata: chunk_metadata(chunk),
                })
                .collect();
            send(self.post("/vectors/upsert").json(&UpsertRequest { vectors, namespace })).await?;
        }
        debug!(namespace, count = chunks.len(), "upserted chunks to pinecone");
        Ok(())
    }

    async fn get_nodes(
        &self,
        namespace: &str,
        filters: &MetadataFilters,
        limit: usize,
    ) -> Result<Vec<Chunk>> {
        // Similarity is irrelevant here; a constant query vector just satisfies
        // the endpoint, which rejects all-zero dense vectors.
        let request = QueryRequest {
            namespace,
            vector: vec![1.0; self.dimensions],
            top_k: limit.clamp(1, MAX_TOP_K),
            filter: filters.to_pinecone(),
            include_metadata: true,
            include_values: false,
        };
        let response: QueryResponse = send(self.post("/query").json(&request))
            .await?
            .json()
            .await
            .map_err(|e| {
                RagError::remote(SERVICE, format!("failed to parse query response: {e}"))
            })?;

        debug!(namespace, count = response.matches.len(), "fetched pinecone nodes");
        Ok(response.matches.into_iter().map(match_to_chunk).collect())
    }

    async fn delete(&self, namespace: &str, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        send(self.post("/vectors/delete").json(&DeleteRequest { ids, namespace })).await?;
        debug!(namespace, count = ids.len(), "deleted chunks from pinecone");
        Ok(())
    }
}
