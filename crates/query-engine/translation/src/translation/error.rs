//! Errors for translation.

use query_engine_sql::sql::string::ArgumentOffsetMismatch;
use thiserror::Error;

/// A type for translation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("table '{0}' not found")]
    TableNotFound(String),
    #[error("fragment '{0}' not found")]
    FragmentNotFound(String),
    #[error("field '{field}' not found in table '{table}'")]
    FieldNotFound { table: String, field: String },
    #[error("column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },
    #[error("field '{field}' is requested more than once in fragment '{fragment}'")]
    DuplicateField { fragment: String, field: String },
    #[error("field '{field}' of table '{table}' is not a relation and cannot take a sub-fragment")]
    UnexpectedSubFragment { table: String, field: String },
    #[error(
        "fragment '{fragment}' is defined on table '{fragment_table}', but field '{field}' relates to table '{table}'"
    )]
    FragmentTableMismatch {
        fragment: String,
        fragment_table: String,
        field: String,
        table: String,
    },
    #[error("fragment '{0}' nests itself")]
    FragmentCycle(String),
    #[error("fragments are nested deeper than the maximum depth of {0}")]
    MaxDepthExceeded(u32),
    #[error("table alias '{0}' is used more than once")]
    DuplicateTableAlias(String),
    #[error("the current user has not been set")]
    CurrentUserNotSet,
    #[error("the current user has already been set")]
    CurrentUserAlreadySet,
    #[error("the current user can only be set on the outermost query")]
    CurrentUserInNestedContext,
    #[error("'{0}' is not a valid function name")]
    InvalidFunctionName(String),
    #[error("unsupported operator '{0}'")]
    UnsupportedOperator(String),
    #[error("invalid operand for '{operator}': {message}")]
    InvalidOperand { operator: String, message: String },
    #[error("column '{column}' of table '{table}' is not a JSON column")]
    NotAJsonColumn { table: String, column: String },
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("{0}")]
    ArgumentOffsetMismatch(#[from] ArgumentOffsetMismatch),
}
