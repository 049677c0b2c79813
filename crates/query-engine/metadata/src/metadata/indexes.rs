//! Indexes declared on tables.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An index over some fields of a table. Dotted field names address a JSON sub-path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IndexInfo {
    #[schemars(with = "IndexMap<String, i8>")]
    pub fields: IndexMap<String, Direction>,
    #[serde(default)]
    pub options: IndexOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndexOptions {
    #[serde(default)]
    pub unique: bool,
    /// A selector over literal values restricting the rows the index covers.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_filter_expression: Option<serde_json::Map<String, serde_json::Value>>,
    /// Makes the index case-insensitive.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<Collation>,
    /// Must never be used inside a transaction.
    #[serde(default)]
    pub concurrently: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Collation {
    pub locale: String,
    pub strength: u8,
}

impl Collation {
    /// Strengths 1 and 2 ignore case.
    pub fn is_case_insensitive(&self) -> bool {
        self.strength <= 2
    }
}

/// A sort or index direction, written as `1` or `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Direction {
    Ascending,
    Descending,
}

impl TryFrom<i64> for Direction {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Direction::Ascending),
            -1 => Ok(Direction::Descending),
            _ => Err(format!("invalid direction {value}, expected 1 or -1")),
        }
    }
}

impl From<Direction> for i64 {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        }
    }
}
