//! Loading input files into [`Document`]s.
//!
//! Each file becomes one document. System metadata derived from the file
//! (path, name, MIME type, size, dates) is merged with the caller's metadata,
//! and the caller's values win on key collisions. A file that cannot be read
//! is recorded as a [`LoadFailure`] and the remaining files are still loaded.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::document::{Document, FILE_PATH_KEY, Metadata};
use crate::error::{RagError, Result};

/// A file to load, optionally with a caller-supplied document key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileInput {
    pub path: PathBuf,
    /// The document key to use. A UUID is generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl FileInput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), id: None }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl From<PathBuf> for FileInput {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&str> for FileInput {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// A file that could not be loaded.
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: RagError,
}

/// The outcome of loading a batch of files.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Documents loaded successfully, in input order.
    pub documents: Vec<Document>,
    /// Files that failed, in input order.
    pub failures: Vec<LoadFailure>,
}

/// Reads files from the local filesystem into documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load every file, attaching merged metadata to each document.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Load`] only if `files` is empty. Per-file failures
    /// are reported in [`LoadReport::failures`].
    pub async fn load(&self, files: &[FileInput], metadata: &Metadata) -> Result<LoadReport> {
        if files.is_empty() {
            return Err(RagError::Load {
                path: PathBuf::new(),
                message: "no files to process".to_string(),
            });
        }

        let mut report = LoadReport::default();
        for input in files {
            match self.load_one(input, metadata).await {
                Ok(document) => {
                    debug!(document.id = %document.id, path = %input.path.display(), "loaded file");
                    report.documents.push(document);
                }
                Err(error) => {
                    warn!(path = %input.path.display(), error = %error, "failed to load file");
                    report.failures.push(LoadFailure { path: input.path.clone(), error });
                }
            }
        }
        Ok(report)
    }

    async fn load_one(&self, input: &FileInput, metadata: &Metadata) -> Result<Document> {
        let path = &input.path;
        let load_err = |message: String| RagError::Load { path: path.clone(), message };

        let bytes = tokio::fs::read(path).await.map_err(|e| load_err(e.to_string()))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| load_err(format!("file is not valid UTF-8: {e}")))?;
        let fs_meta = tokio::fs::metadata(path).await.map_err(|e| load_err(e.to_string()))?;

        let mut merged = file_metadata(path, &fs_meta);
        merged.extend(metadata.iter().map(|(k, v)| (k.clone(), v.clone())));

        let id = input.id.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Ok(Document { id, text, metadata: merged, source_path: Some(path.clone()) })
    }
}

/// System-derived metadata for a file.
pub fn file_metadata(path: &Path, fs_meta: &std::fs::Metadata) -> Metadata {
    let mut meta = Metadata::new();
    meta.insert(FILE_PATH_KEY.into(), Value::String(path.display().to_string()));
    if let Some(name) = path.file_name() {
        meta.insert("file_name".into(), Value::String(name.to_string_lossy().into_owned()));
    }
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    meta.insert("file_type".into(), Value::String(mime.essence_str().to_string()));
    meta.insert("file_size".into(), Value::from(fs_meta.len()));
    if let Ok(created) = fs_meta.created() {
        meta.insert("creation_date".into(), Value::String(format_date(created)));
    }
    if let Ok(modified) = fs_meta.modified() {
        meta.insert("last_modified_date".into(), Value::String(format_date(modified)));
    }
    meta
}

fn format_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn user_meta() -> Metadata {
        json!({"source": "email", "file_name": "override.txt"}).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn loads_text_and_merges_metadata() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("notes.txt");
        fs::write(&path, "hello world").unwrap();

        let report = DocumentLoader::new()
            .load(&[FileInput::new(&path).with_id("doc1")], &user_meta())
            .await
            .unwrap();

        assert!(report.failures.is_empty());
        let doc = &report.documents[0];
        assert_eq!(doc.id, "doc1");
        assert_eq!(doc.text, "hello world");
        assert_eq!(doc.file_path(), Some(path.display().to_string().as_str()));
        assert_eq!(doc.metadata["file_type"], json!("text/plain"));
        assert_eq!(doc.metadata["file_size"], json!(11));
        assert_eq!(doc.metadata["source"], json!("email"));
        // user-supplied value wins
        assert_eq!(doc.metadata["file_name"], json!("override.txt"));
    }

    #[tokio::test]
    async fn generates_ids_when_absent() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("a.md");
        fs::write(&path, "# a").unwrap();

        let report =
            DocumentLoader::new().load(&[FileInput::new(&path)], &Metadata::new()).await.unwrap();
        assert!(uuid::Uuid::parse_str(&report.documents[0].id).is_ok());
    }

    #[tokio::test]
    async fn collects_failures_without_aborting() {
        let temp = tempfile::tempdir().unwrap();
        let good = temp.path().join("good.txt");
        let binary = temp.path().join("bad.bin");
        fs::write(&good, "ok").unwrap();
        fs::write(&binary, [0xff, 0xfe, 0x00]).unwrap();
        let missing = temp.path().join("missing.txt");

        let files = [FileInput::new(&missing), FileInput::new(&good), FileInput::new(&binary)];
        let report = DocumentLoader::new().load(&files, &Metadata::new()).await.unwrap();

        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].path, missing);
        assert!(matches!(report.failures[1].error, RagError::Load { .. }));
    }

    #[tokio::test]
    async fn merged_metadata_keeps_validated_fields() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("report.pdf.txt");
        fs::write(&path, "body").unwrap();
        let user = json!({
            "source": "upload",
            "user_id": "a@x.com",
            "client": "Acme",
            "title": "Report",
            "tag": ["q3"],
            "file_type": "application/pdf",
        })
        .as_object()
        .cloned()
        .unwrap();
        let validated = crate::metadata::validate_metadata(&user).unwrap();

        let report = DocumentLoader::new().load(&[FileInput::new(&path)], &user).await.unwrap();
        let merged = crate::metadata::validate_metadata(&report.documents[0].metadata).unwrap();
        assert_eq!(merged.source, validated.source);
        assert_eq!(merged.tag, validated.tag);
        assert_eq!(merged.extra["file_type"], json!("application/pdf"));
        assert!(merged.extra.contains_key("file_size"));
    }

    #[tokio::test]
    async fn empty_input_is_an_error() {
        let err = DocumentLoader::new().load(&[], &Metadata::new()).await.unwrap_err();
        assert!(err.to_string().contains("no files to process"));
    }
}
