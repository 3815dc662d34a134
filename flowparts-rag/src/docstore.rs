//! Document store trait for keyed full-document persistence.

use async_trait::async_trait;

use crate::document::Document;
use crate::error::Result;

/// A key-value store holding full documents by their key.
///
/// This is the second half of the dual write: chunk nodes in the vector
/// store point back here through [`Chunk::document_id`](crate::Chunk).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store a document under its key, replacing any previous record.
    async fn put(&self, document: &Document) -> Result<()>;

    /// Fetch a document by key. Returns `Ok(None)` if no record exists.
    async fn get(&self, id: &str) -> Result<Option<Document>>;

    /// Delete a document by key. Deleting a missing key is not an error.
    async fn delete(&self, id: &str) -> Result<()>;
}
