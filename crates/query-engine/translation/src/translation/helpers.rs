//! Helpers for processing requests and building SQL.

use fragment_sql_configuration::CompilerSettings;
use query_engine_metadata::metadata;

use super::error::Error;

/// Static information from the metadata and the settings.
#[derive(Debug, Clone, Copy)]
pub struct Env<'a> {
    pub metadata: &'a metadata::Metadata,
    pub settings: &'a CompilerSettings,
}

/// A table's name in the metadata together with its information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableNameAndInfo<'a> {
    pub name: &'a str,
    pub info: &'a metadata::TableInfo,
}

impl<'a> Env<'a> {
    /// Create a new Env by supplying the metadata and the compiler settings.
    pub fn new(metadata: &'a metadata::Metadata, settings: &'a CompilerSettings) -> Env<'a> {
        Env { metadata, settings }
    }

    /// Lookup a table's information in the metadata.
    pub fn lookup_table(&self, table_name: &str) -> Result<TableNameAndInfo<'a>, Error> {
        lookup_table(self.metadata, table_name)
    }

    /// Lookup a fragment in the metadata, together with its name.
    pub fn lookup_fragment(
        &self,
        fragment_name: &str,
    ) -> Result<(&'a str, &'a metadata::FragmentInfo), Error> {
        self.metadata
            .fragments
            .0
            .get_key_value(fragment_name)
            .map(|(name, fragment)| (name.as_str(), fragment))
            .ok_or_else(|| Error::FragmentNotFound(fragment_name.to_string()))
    }
}

/// Lookup a table's information in the metadata.
pub fn lookup_table<'a>(
    metadata: &'a metadata::Metadata,
    table_name: &str,
) -> Result<TableNameAndInfo<'a>, Error> {
    metadata
        .tables
        .0
        .get_key_value(table_name)
        .map(|(name, info)| TableNameAndInfo { name, info })
        .ok_or_else(|| Error::TableNotFound(table_name.to_string()))
}

impl<'a> TableNameAndInfo<'a> {
    /// Lookup a field of this table.
    pub fn lookup_field(&self, field_name: &str) -> Result<&'a metadata::FieldInfo, Error> {
        self.info
            .fields
            .get(field_name)
            .ok_or_else(|| Error::FieldNotFound {
                table: self.name.to_string(),
                field: field_name.to_string(),
            })
    }

    /// Lookup a field of this table that is backed by a column.
    pub fn lookup_column(&self, column_name: &str) -> Result<&'a metadata::ColumnInfo, Error> {
        self.info
            .column(column_name)
            .ok_or_else(|| Error::ColumnNotFound {
                table: self.name.to_string(),
                column: column_name.to_string(),
            })
    }
}

/// Produces the aliases of joined tables.
///
/// Tests use a constant alias to get reproducible SQL; everything else should
/// use a generator that never repeats itself, such as [`SequentialAliasGenerator`].
pub trait AliasGenerator {
    fn next_alias(&mut self) -> String;
}

impl<F> AliasGenerator for F
where
    F: FnMut() -> String,
{
    fn next_alias(&mut self) -> String {
        self()
    }
}

/// Generates `j1`, `j2`, ...
#[derive(Debug, Default)]
pub struct SequentialAliasGenerator {
    count: u64,
}

impl SequentialAliasGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AliasGenerator for SequentialAliasGenerator {
    fn next_alias(&mut self) -> String {
        self.count += 1;
        format!("j{}", self.count)
    }
}
