//! Named fragments: the trees of fields requested over a table.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Mapping from a fragment name to its definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FragmentsInfo(pub BTreeMap<String, FragmentInfo>);

impl FragmentsInfo {
    pub fn empty() -> Self {
        FragmentsInfo(BTreeMap::new())
    }
}

/// The fields requested over one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FragmentInfo {
    pub table: String,
    pub fields: Vec<FieldSelection>,
}

/// A single requested field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldSelection {
    /// A column, a computed field, or a relation returning only the related row.
    Field(String),
    /// A relation whose related row is shaped by another fragment.
    Nested { name: String, fragment: String },
}

impl FieldSelection {
    pub fn name(&self) -> &str {
        match self {
            FieldSelection::Field(name) | FieldSelection::Nested { name, .. } => name,
        }
    }
}
