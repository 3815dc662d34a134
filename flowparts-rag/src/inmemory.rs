//! In-memory vector and document stores.
//!
//! [`InMemoryVectorStore`] and [`InMemoryDocumentStore`] keep everything in
//! maps behind a `tokio::sync::RwLock`. They are suitable for development,
//! testing and small single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::docstore::DocumentStore;
use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};
use crate::filter::MetadataFilters;
use crate::vectorstore::VectorStore;

/// An in-memory vector store.
///
/// Namespaces map to insertion-ordered chunk lists; an upsert with an
/// existing chunk ID replaces that chunk in place. [`get_nodes`](VectorStore::get_nodes)
/// returns matches in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    namespaces: RwLock<HashMap<String, Vec<Chunk>>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks stored in a namespace.
    pub async fn len(&self, namespace: &str) -> usize {
        self.namespaces.read().await.get(namespace).map_or(0, Vec::len)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, namespace: &str, chunks: &[Chunk]) -> Result<()> {
        if let Some(chunk) = chunks.iter().find(|c| c.embedding.is_empty()) {
            return Err(RagError::remote(
                "in-memory vector store",
                format!("chunk '{}' has no embedding", chunk.id),
            ));
        }

        let mut namespaces = self.namespaces.write().await;
        let store = namespaces.entry(namespace.to_string()).or_default();
        for chunk in chunks {
            match store.iter_mut().find(|existing| existing.id == chunk.id) {
                Some(existing) => *existing = chunk.clone(),
                None => store.push(chunk.clone()),
            }
        }
        Ok(())
    }

    async fn get_nodes(
        &self,
        namespace: &str,
        filters: &MetadataFilters,
        limit: usize,
    ) -> Result<Vec<Chunk>> {
        let namespaces = self.namespaces.read().await;
        let Some(store) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };
        Ok(store.iter().filter(|c| filters.matches(&c.metadata)).take(limit).cloned().collect())
    }

    async fn delete(&self, namespace: &str, ids: &[&str]) -> Result<()> {
        let mut namespaces = self.namespaces.write().await;
        if let Some(store) = namespaces.get_mut(namespace) {
            store.retain(|c| !ids.contains(&c.id.as_str()));
        }
        Ok(())
    }
}

/// An in-memory document store keyed by document ID.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, Document>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn put(&self, document: &Document) -> Result<()> {
        self.documents.write().await.insert(document.id.clone(), document.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.documents.write().await.remove(id);
        Ok(())
    }
}
