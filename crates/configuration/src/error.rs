//! Errors that can be thrown when processing configuration.

use std::path::PathBuf;

use thiserror::Error;

use crate::version1::CURRENT_VERSION;

/// The errors that can be thrown when parsing a configuration.
#[derive(Debug, Error)]
pub enum ParseConfigurationError {
    #[error("parse error on {file_path}:{line}:{column}: {message}")]
    ParseError {
        file_path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("unsupported configuration version {0}, expected version {CURRENT_VERSION}")]
    UnsupportedVersion(u32),
    #[error("I/O error: {0}")]
    IoErrorButStringified(String),
}

/// The errors that can be thrown when writing a configuration to disk.
#[derive(Debug, Error)]
pub enum WriteParsedConfigurationError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// The configuration could not be turned into a runtime configuration.
#[derive(Debug, Error)]
pub enum MakeRuntimeConfigurationError {
    #[error("invalid metadata:{}", display_errors(.0))]
    InvalidMetadata(Vec<MetadataError>),
}

fn display_errors(errors: &[MetadataError]) -> String {
    errors.iter().map(|error| format!("\n  - {error}")).collect()
}

/// A single problem found while validating the metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("table '{0}' has no '_id' column")]
    MissingPrimaryKey(String),
    #[error("field '{table}.{field}' refers to unknown table '{referenced}'")]
    UnknownTable {
        table: String,
        field: String,
        referenced: String,
    },
    #[error("field '{table}.{field}' refers to unknown column '{referenced_table}.{column}'")]
    UnknownColumn {
        table: String,
        field: String,
        referenced_table: String,
        column: String,
    },
    #[error("field '{table}.{field}' calls '{function}', which is not a valid function name")]
    InvalidFunctionName {
        table: String,
        field: String,
        function: String,
    },
    #[error("index on table '{table}' refers to unknown column '{column}'")]
    UnknownIndexColumn { table: String, column: String },
    #[error("fragment '{fragment}' is defined on unknown table '{table}'")]
    UnknownFragmentTable { fragment: String, table: String },
    #[error("fragment '{fragment}' requests unknown field '{field}'")]
    UnknownFragmentField { fragment: String, field: String },
    #[error("fragment '{fragment}' nests unknown fragment '{nested}' in field '{field}'")]
    UnknownNestedFragment {
        fragment: String,
        field: String,
        nested: String,
    },
    #[error("fragment '{fragment}' nests a fragment in '{field}', which is not a relation")]
    NestedFragmentOnNonRelation { fragment: String, field: String },
    #[error("the current user table '{0}' is not a known table")]
    UnknownCurrentUserTable(String),
}
