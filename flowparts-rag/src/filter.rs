//! Metadata filters for server-side node selection.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::document::{DOCUMENT_ID_KEY, Metadata};

/// Comparison applied by a [`MetadataFilter`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Field equals the value.
    Eq,
    /// Field does not equal the value.
    Ne,
    /// Field equals one of the values in a list.
    In,
}

/// How multiple filters combine.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterCondition {
    #[default]
    And,
    Or,
}

/// A single `key <op> value` predicate on chunk metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetadataFilter {
    pub key: String,
    pub value: Value,
    pub operator: FilterOperator,
}

impl MetadataFilter {
    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { key: key.into(), value: value.into(), operator: FilterOperator::Eq }
    }

    pub fn ne(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { key: key.into(), value: value.into(), operator: FilterOperator::Ne }
    }

    pub fn is_in(key: impl Into<String>, values: Vec<Value>) -> Self {
        Self { key: key.into(), value: Value::Array(values), operator: FilterOperator::In }
    }

    /// Evaluate the predicate against a metadata map.
    ///
    /// A list-valued field matches `Eq` when any element equals the value,
    /// which mirrors how vector backends treat string-list metadata.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        let field = metadata.get(&self.key);
        let field_has = |target: &Value| match field {
            Some(Value::Array(items)) => items.contains(target),
            Some(value) => value == target,
            None => false,
        };
        match self.operator {
            FilterOperator::Eq => field_has(&self.value),
            FilterOperator::Ne => !field_has(&self.value),
            FilterOperator::In => match &self.value {
                Value::Array(candidates) => candidates.iter().any(field_has),
                other => field_has(other),
            },
        }
    }

    fn to_pinecone(&self) -> Value {
        let op = match self.operator {
            FilterOperator::Eq => "$eq",
            FilterOperator::Ne => "$ne",
            FilterOperator::In => "$in",
        };
        json!({ self.key.as_str(): { op: self.value } })
    }
}

/// A set of [`MetadataFilter`]s combined by a [`FilterCondition`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetadataFilters {
    pub filters: Vec<MetadataFilter>,
    #[serde(default)]
    pub condition: FilterCondition,
}

impl MetadataFilters {
    pub fn new(filters: Vec<MetadataFilter>) -> Self {
        Self { filters, condition: FilterCondition::And }
    }

    /// Select chunk nodes whose back-relationship equals `document_id`.
    pub fn for_document(document_id: &str) -> Self {
        Self::new(vec![MetadataFilter::eq(DOCUMENT_ID_KEY, document_id)])
    }

    pub fn with_condition(mut self, condition: FilterCondition) -> Self {
        self.condition = condition;
        self
    }

    /// Evaluate every filter locally. An empty filter set matches everything.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self.condition {
            FilterCondition::And => self.filters.iter().all(|f| f.matches(metadata)),
            FilterCondition::Or => {
                self.filters.is_empty() || self.filters.iter().any(|f| f.matches(metadata))
            }
        }
    }

    /// Render in Pinecone's filter language, or `None` for an empty set.
    pub fn to_pinecone(&self) -> Option<Value> {
        match self.filters.as_slice() {
            [] => None,
            [single] => Some(single.to_pinecone()),
            many => {
                let key = match self.condition {
                    FilterCondition::And => "$and",
                    FilterCondition::Or => "$or",
                };
                let clauses: Vec<Value> = many.iter().map(MetadataFilter::to_pinecone).collect();
                Some(json!({ key: clauses }))
            }
        }
    }
}
