//! Data types for documents and chunk nodes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Open key-value metadata attached to documents and chunks.
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key holding the back-relationship from a chunk to its document.
pub const DOCUMENT_ID_KEY: &str = "document_id";

/// Metadata key holding a chunk's position within its document.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// Metadata key holding the originating file path.
pub const FILE_PATH_KEY: &str = "file_path";

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// The document key (`file_id`), supplied by the caller or generated.
    pub id: String,
    /// The full text body of the document.
    pub text: String,
    /// System-derived and user-supplied metadata.
    pub metadata: Metadata,
    /// The file this document was loaded from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
}

impl Document {
    /// Create a document with the given key and text and no metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: Metadata::new(), source_path: None }
    }

    /// Replace the document metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The `file_path` metadata value, if present and a string.
    pub fn file_path(&self) -> Option<&str> {
        self.metadata.get(FILE_PATH_KEY).and_then(Value::as_str)
    }
}

/// A searchable segment of a [`Document`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// Metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: Metadata,
    /// The key of the owning [`Document`].
    pub document_id: String,
}
