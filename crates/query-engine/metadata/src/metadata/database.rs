//! Metadata information regarding the database tables and the fields exposed over them.

use std::collections::BTreeMap;

use enum_iterator::Sequence;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::indexes::IndexInfo;
use super::permissions::ReadPermission;

/// The primary key column every table has.
pub const PRIMARY_KEY: &str = "_id";

/// The scalar types supported by the Engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Sequence, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Boolean,
    Smallint,
    Integer,
    Bigint,
    Real,
    #[serde(rename = "double precision")]
    DoublePrecision,
    Numeric,
    Character,
    #[serde(rename = "character varying")]
    CharacterVarying,
    Text,
    Json,
    Jsonb,
    Date,
    #[serde(rename = "timestamp with time zone")]
    TimestampWithTimeZone,
    #[serde(rename = "timestamp without time zone")]
    TimestampWithoutTimeZone,
    Uuid,
}

impl ScalarType {
    /// The name of the type as written in a cast.
    pub fn sql_name(self) -> &'static str {
        match self {
            ScalarType::Boolean => "BOOLEAN",
            ScalarType::Smallint => "SMALLINT",
            ScalarType::Integer => "INTEGER",
            ScalarType::Bigint => "BIGINT",
            ScalarType::Real => "REAL",
            ScalarType::DoublePrecision => "DOUBLE PRECISION",
            ScalarType::Numeric => "NUMERIC",
            ScalarType::Character => "CHARACTER",
            ScalarType::CharacterVarying => "VARCHAR",
            ScalarType::Text => "TEXT",
            ScalarType::Json => "JSON",
            ScalarType::Jsonb => "JSONB",
            ScalarType::Date => "DATE",
            ScalarType::TimestampWithTimeZone => "TIMESTAMPTZ",
            ScalarType::TimestampWithoutTimeZone => "TIMESTAMP",
            ScalarType::Uuid => "UUID",
        }
    }

    /// Strings, which can be compared case-insensitively and coalesced to `''`.
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            ScalarType::Character | ScalarType::CharacterVarying | ScalarType::Text
        )
    }

    /// Types whose values can be addressed with a JSON path.
    pub fn is_json(self) -> bool {
        matches!(self, ScalarType::Json | ScalarType::Jsonb)
    }
}

/// The type of a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    ScalarType(ScalarType),
    ArrayType(Box<Type>),
}

impl Type {
    /// The scalar type, if this is not an array.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Type::ScalarType(scalar_type) => Some(*scalar_type),
            Type::ArrayType(_) => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::ArrayType(_))
    }
}

/// Mapping from a table name to its information.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct TablesInfo(pub BTreeMap<String, TableInfo>);

impl TablesInfo {
    pub fn empty() -> Self {
        TablesInfo(BTreeMap::new())
    }
}

/// Information about a database table and the fields it exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableInfo {
    pub fields: IndexMap<String, FieldInfo>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexInfo>,
}

impl TableInfo {
    /// Look up a field that is backed by a column.
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        match self.fields.get(name) {
            Some(FieldInfo {
                kind: FieldKind::Column(column),
                ..
            }) => Some(column),
            _ => None,
        }
    }

    /// All fields backed by a column, in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = (&String, &FieldInfo, &ColumnInfo)> {
        self.fields.iter().filter_map(|(name, field)| match &field.kind {
            FieldKind::Column(column) => Some((name, field, column)),
            FieldKind::Computed(_) | FieldKind::Relation(_) => None,
        })
    }
}

/// A field exposed by a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldInfo {
    #[serde(flatten)]
    pub kind: FieldKind,
    /// The field is readable when this is empty or any entry allows the current user.
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub can_read: Vec<ReadPermission>,
}

/// How the value of a field is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    /// Read directly from a column of the table.
    Column(ColumnInfo),
    /// Computed by a SQL expression, possibly over joined tables.
    Computed(ComputedField),
    /// A related row of another table, returned as a nested object.
    Relation(RelationField),
}

/// Can this column contain null values
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Nullable {
    #[default]
    Nullable,
    NonNullable,
}

/// Information about a database column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnInfo {
    pub r#type: Type,
    #[serde(default)]
    pub nullable: Nullable,
}

impl ColumnInfo {
    pub fn is_nullable(&self) -> bool {
        self.nullable == Nullable::Nullable
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ComputedField {
    pub expression: ComputedExpression,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RelationField {
    pub join: JoinSpec,
}

/// A join to another table.
///
/// Two joins are the same join when they are structurally equal, no matter
/// which field asked for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct JoinSpec {
    pub table: String,
    #[serde(default)]
    pub join_type: JoinType,
    /// Conditions keyed by a column of the joined table.
    pub on: IndexMap<String, JoinOperand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    #[default]
    Left,
    Inner,
}

/// What a column of a joined table is compared to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JoinOperand {
    /// A column of the table doing the join.
    Column(String),
    /// A column of the current user.
    CurrentUserColumn(String),
    /// A resolver argument supplied with the request.
    ResolverArg(String),
    /// A fixed value.
    Value(serde_json::Value),
}

/// The expression language of computed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ComputedExpression {
    Column(String),
    CurrentUserColumn(String),
    ResolverArg(String),
    Value(serde_json::Value),
    /// A column of a joined table.
    JoinedColumn {
        join: JoinSpec,
        column: String,
    },
    /// The whole row of a joined table as JSON, or NULL when there is none.
    JoinedRow {
        join: JoinSpec,
    },
    FunctionCall {
        function: String,
        #[serde(default)]
        arguments: Vec<ComputedExpression>,
    },
    BinaryOperation {
        left: Box<ComputedExpression>,
        operator: ComputedOperator,
        right: Box<ComputedExpression>,
    },
    IsNull(Box<ComputedExpression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ComputedOperator {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    Plus,
    Minus,
    Multiply,
    Divide,
}
