//! Collecting per-document outcomes into a result table.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::document::{Document, Metadata};
use crate::error::Result;
use crate::loader::LoadFailure;

/// One successfully processed document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestRow {
    pub document_id: String,
    pub text: String,
    pub metadata: Metadata,
    /// The originating path, or `"Unknown"`.
    pub file_path: String,
}

/// A document or file that could not be processed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    pub file_path: String,
    pub error: String,
}

/// Tabular ingestion result: one row per processed document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IngestTable {
    pub rows: Vec<IngestRow>,
    pub failures: Vec<IngestFailure>,
}

impl IngestTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

const UNKNOWN_PATH: &str = "Unknown";

/// Build the table from per-document outcomes, in order.
///
/// Failed documents produce no row; each is logged and kept in
/// [`IngestTable::failures`]. The batch is never aborted.
pub fn aggregate<I>(outcomes: I) -> IngestTable
where
    I: IntoIterator<Item = (Document, Result<usize>)>,
{
    let mut table = IngestTable::default();
    for (document, outcome) in outcomes {
        let file_path = document.file_path().unwrap_or(UNKNOWN_PATH).to_string();
        match outcome {
            Ok(_) => table.rows.push(IngestRow {
                document_id: document.id,
                text: document.text,
                metadata: document.metadata,
                file_path,
            }),
            Err(error) => {
                warn!(
                    document.id = %document.id,
                    file_path = %file_path,
                    error = %error,
                    "error processing document"
                );
                table.failures.push(IngestFailure {
                    document_id: Some(document.id),
                    file_path,
                    error: error.to_string(),
                });
            }
        }
    }
    table
}

/// Fold loader failures into an existing table.
pub fn record_load_failures(table: &mut IngestTable, failures: Vec<LoadFailure>) {
    for failure in failures {
        let file_path = failure.path.display().to_string();
        warn!(file_path = %file_path, error = %failure.error, "error loading file");
        table.failures.push(IngestFailure {
            document_id: None,
            file_path,
            error: failure.error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;
    use serde_json::json;

    fn doc(id: &str, path: Option<&str>) -> Document {
        let mut d = Document::new(id, format!("body of {id}"));
        if let Some(path) = path {
            d.metadata.insert("file_path".into(), json!(path));
        }
        d
    }

    #[test]
    fn failures_do_not_produce_rows() {
        let table = aggregate(vec![
            (doc("a", Some("/tmp/a.txt")), Ok(1)),
            (doc("b", Some("/tmp/b.txt")), Err(RagError::remote("pinecone", "boom"))),
            (doc("c", None), Ok(1)),
        ]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].file_path, "/tmp/a.txt");
        assert_eq!(table.rows[1].file_path, "Unknown");
        assert_eq!(table.failures.len(), 1);
        assert_eq!(table.failures[0].document_id.as_deref(), Some("b"));
        assert!(table.failures[0].error.contains("boom"));
    }

    #[test]
    fn load_failures_are_recorded() {
        let mut table = IngestTable::default();
        record_load_failures(
            &mut table,
            vec![LoadFailure {
                path: "/tmp/missing.txt".into(),
                error: RagError::Load { path: "/tmp/missing.txt".into(), message: "nope".into() },
            }],
        );
        assert!(table.is_empty());
        assert_eq!(table.failures[0].file_path, "/tmp/missing.txt");
        assert_eq!(table.failures[0].document_id, None);
    }
}
