//! Error types for the `flowparts-rag` crate.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A single metadata schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataViolation {
    /// A required field is absent.
    Missing {
        /// The name of the missing field.
        field: &'static str,
    },
    /// A required field is present but has the wrong shape.
    WrongType {
        /// The name of the offending field.
        field: &'static str,
        /// A short description of the expected shape.
        expected: &'static str,
    },
}

impl MetadataViolation {
    /// Return the name of the field this violation refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Missing { field } | Self::WrongType { field, .. } => *field,
        }
    }
}

impl fmt::Display for MetadataViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { field } => write!(f, "{field}: field required"),
            Self::WrongType { field, expected } => write!(f, "{field}: expected {expected}"),
        }
    }
}

/// Errors that can occur while ingesting or retrieving documents.
#[derive(Debug, Error)]
pub enum RagError {
    /// Document metadata does not satisfy the required-field schema.
    #[error("Metadata validation failed: {}", join_violations(.violations))]
    Validation {
        /// Every violation found, in schema order.
        violations: Vec<MetadataViolation>,
    },

    /// An input file could not be opened or decoded.
    #[error("Failed to load '{}': {message}", .path.display())]
    Load {
        /// The file that failed to load.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// A call to the vector store, document store or embedding backend failed.
    #[error("Remote call to {service} failed: {message}")]
    RemoteCall {
        /// The external service that produced the error.
        service: String,
        /// A description of the failure.
        message: String,
    },

    /// A query or lookup returned no match.
    #[error("No {what} found for key '{key}'")]
    NotFound {
        /// What was being looked up (`"chunk"` or `"document"`).
        what: &'static str,
        /// The key that did not resolve.
        key: String,
    },

    /// A configuration or construction error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RagError {
    /// Build a [`RagError::RemoteCall`] for the named service.
    pub fn remote(service: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::RemoteCall { service: service.into(), message: message.to_string() }
    }

    /// Returns `true` if this is a [`RagError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn join_violations(violations: &[MetadataViolation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// A convenience result type for ingestion and retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_violation() {
        let err = RagError::Validation {
            violations: vec![
                MetadataViolation::Missing { field: "source" },
                MetadataViolation::WrongType { field: "tag", expected: "a list of strings" },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Metadata validation failed: source: field required; tag: expected a list of strings"
        );
    }

    #[test]
    fn not_found_names_key() {
        let err = RagError::NotFound { what: "document", key: "doc1".into() };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "No document found for key 'doc1'");
    }
}
