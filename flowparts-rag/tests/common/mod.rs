#![allow(dead_code)]

use async_trait::async_trait;
use flowparts_rag::{Document, DocumentStore, EmbeddingProvider, RagError};
use serde_json::{Value, json};

/// Deterministic hash-based embeddings. Texts containing `FAIL` are rejected.
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> flowparts_rag::Result<Vec<f32>> {
        if text.contains("FAIL") {
            return Err(RagError::remote("mock embeddings", "rejected input"));
        }
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut emb = vec![0.0f32; self.dimensions];
        for (i, v) in emb.iter_mut().enumerate() {
            *v = ((hash.wrapping_add(i as u64)) as f32).sin();
        }
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// A document store whose writes always fail and whose reads find nothing.
pub struct UnavailableDocumentStore;

#[async_trait]
impl DocumentStore for UnavailableDocumentStore {
    async fn put(&self, _document: &Document) -> flowparts_rag::Result<()> {
        Err(RagError::remote("document store", "connection refused"))
    }

    async fn get(&self, _id: &str) -> flowparts_rag::Result<Option<Document>> {
        Ok(None)
    }

    async fn delete(&self, _id: &str) -> flowparts_rag::Result<()> {
        Ok(())
    }
}

pub fn valid_metadata() -> Value {
    json!({
        "source": "email",
        "user_id": "a@x.com",
        "client": "Acme",
        "title": "T",
        "tag": ["x"],
    })
}
