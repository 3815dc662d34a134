//! Required-field validation for user-supplied document metadata.
//!
//! Uploaded documents must carry `source`, `user_id`, `client`, `title` and a
//! `tag` list. Any other keys are allowed and are carried through untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Metadata;
use crate::error::{MetadataViolation, RagError, Result};

/// The required string fields, in schema order.
pub const REQUIRED_STRING_FIELDS: [&str; 4] = ["source", "user_id", "client", "title"];

/// The required list-of-strings field.
pub const TAG_FIELD: &str = "tag";

/// Metadata that passed validation.
///
/// The required fields are typed; everything else lives in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    /// Where this document came from.
    pub source: String,
    /// The uploader's identifier (usually an email).
    pub user_id: String,
    /// The client this document is for.
    pub client: String,
    /// The title of the document.
    pub title: String,
    /// Tags attached to the document.
    pub tag: Vec<String>,
    /// Any keys outside the required set.
    #[serde(flatten)]
    pub extra: Metadata,
}

impl DocumentMetadata {
    /// Convert back into the open mapping that was validated.
    pub fn into_map(self) -> Metadata {
        let mut map = Metadata::new();
        map.insert("source".into(), Value::String(self.source));
        map.insert("user_id".into(), Value::String(self.user_id));
        map.insert("client".into(), Value::String(self.client));
        map.insert("title".into(), Value::String(self.title));
        let tag = self.tag.into_iter().map(Value::String).collect();
        map.insert(TAG_FIELD.into(), Value::Array(tag));
        map.extend(self.extra);
        map
    }
}

/// Validate a metadata mapping against the required-field schema.
///
/// All violations are collected before returning, so a caller sees every
/// missing or mistyped field at once.
///
/// # Errors
///
/// Returns [`RagError::Validation`] listing each [`MetadataViolation`].
pub fn validate_metadata(metadata: &Metadata) -> Result<DocumentMetadata> {
    let mut violations = Vec::new();
    let mut strings: [String; 4] = Default::default();

    for (slot, field) in strings.iter_mut().zip(REQUIRED_STRING_FIELDS) {
        match metadata.get(field) {
            None | Some(Value::Null) => violations.push(MetadataViolation::Missing { field }),
            Some(Value::String(s)) => *slot = s.clone(),
            Some(_) => {
                violations.push(MetadataViolation::WrongType { field, expected: "a string" })
            }
        }
    }

    let tag = match metadata.get(TAG_FIELD) {
        None | Some(Value::Null) => {
            violations.push(MetadataViolation::Missing { field: TAG_FIELD });
            Vec::new()
        }
        Some(Value::Array(items)) => {
            let tags: Option<Vec<String>> =
                items.iter().map(|item| item.as_str().map(str::to_string)).collect();
            tags.unwrap_or_else(|| {
                violations.push(MetadataViolation::WrongType {
                    field: TAG_FIELD,
                    expected: "a list of strings",
                });
                Vec::new()
            })
        }
        Some(_) => {
            violations.push(MetadataViolation::WrongType {
                field: TAG_FIELD,
                expected: "a list of strings",
            });
            Vec::new()
        }
    };

    if !violations.is_empty() {
        return Err(RagError::Validation { violations });
    }

    let extra = metadata
        .iter()
        .filter(|(key, _)| !REQUIRED_STRING_FIELDS.contains(&key.as_str()) && *key != TAG_FIELD)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let [source, user_id, client, title] = strings;
    Ok(DocumentMetadata { source, user_id, client, title, tag, extra })
}

/// Validate an arbitrary JSON value, which must be an object.
///
/// # Errors
///
/// Returns [`RagError::Validation`] if the value is not an object (every
/// required field is then reported missing) or fails [`validate_metadata`].
pub fn validate_metadata_value(value: &Value) -> Result<DocumentMetadata> {
    match value {
        Value::Object(map) => validate_metadata(map),
        _ => validate_metadata(&Metadata::new()),
    }
}
