//! `CREATE INDEX` and `DROP INDEX` statements for the indexes of a table.
//!
//! A `CONCURRENTLY` index cannot be built inside a transaction. Nothing here
//! checks that; whoever runs the statement must not open one.

use indexmap::IndexMap;
use query_engine_metadata::metadata::{Direction, IndexInfo, IndexOptions, Metadata, ScalarType};
use query_engine_sql::sql;
use query_engine_sql::sql::string::{Arguments, DDL, SQL};

use crate::translation::error::Error;
use crate::translation::helpers::{lookup_table, TableNameAndInfo};
use crate::translation::query::filtering::{split_field_path, translate_filter, SelectorTarget};

/// An index over some fields of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIndex {
    table: String,
    fields: IndexMap<String, Direction>,
    options: IndexOptions,
}

impl TableIndex {
    pub fn new(table: impl Into<String>, fields: IndexMap<String, Direction>) -> Self {
        TableIndex {
            table: table.into(),
            fields,
            options: IndexOptions::default(),
        }
    }

    pub fn with_options(mut self, options: IndexOptions) -> Self {
        self.options = options;
        self
    }

    /// An index declared on a table in the metadata.
    pub fn from_info(table: impl Into<String>, info: &IndexInfo) -> Self {
        TableIndex::new(table, info.fields.clone()).with_options(info.options.clone())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> &IndexMap<String, Direction> {
        &self.fields
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// `idx_<table>_<field>_<field>..`, with the dots of JSON paths doubled
    /// into underscores, then `_filtered` for a partial index and `_ci` for a
    /// collated one. Directions are not part of the name.
    pub fn name(&self) -> String {
        let mut name = format!("idx_{}", self.table);
        for field in self.fields.keys() {
            name.push('_');
            name.push_str(&field.replace('.', "__"));
        }
        if self.options.partial_filter_expression.is_some() {
            name.push_str("_filtered");
        }
        if self.options.collation.is_some() {
            name.push_str("_ci");
        }
        name
    }

    /// `gin` as soon as any field is a JSON path, `btree` otherwise.
    pub fn method(&self) -> sql::ast::IndexMethod {
        if self.fields.keys().any(|field| field.contains('.')) {
            sql::ast::IndexMethod::Gin
        } else {
            sql::ast::IndexMethod::Btree
        }
    }
}

/// Translate an index into a `CREATE INDEX IF NOT EXISTS` statement.
/// Values of the partial filter are bound as arguments in key order.
pub fn translate_create_index(metadata: &Metadata, index: &TableIndex) -> Result<DDL, Error> {
    let table = lookup_table(metadata, &index.table)?;
    let method = index.method();
    if index.options.unique && method == sql::ast::IndexMethod::Gin {
        return Err(Error::NotSupported(format!(
            "unique index '{}' over a JSON path",
            index.name()
        )));
    }

    let elements = index
        .fields
        .keys()
        .map(|field| translate_index_element(table, field, &index.options))
        .collect::<Result<Vec<_>, Error>>()?;

    let mut arguments = Arguments::new();
    let where_ = match &index.options.partial_filter_expression {
        None => sql::helpers::empty_where(),
        Some(filter) => {
            let target = SelectorTarget {
                table,
                alias: None,
                case_insensitive: false,
            };
            translate_filter(&target, &mut arguments, filter)?
        }
    };

    let statement = sql::ast::CreateIndex {
        name: sql::ast::IndexName(index.name()),
        table: sql::ast::TableName(table.name.to_string()),
        unique: index.options.unique,
        concurrently: index.options.concurrently,
        if_not_exists: true,
        method,
        elements,
        where_: sql::ast::Where(where_),
    };

    let mut sql = SQL::new();
    statement.to_sql(&mut sql);
    sql.params = arguments.into_params();
    tracing::info!(index = %index.name(), params = sql.params.len(), "Generated DDL: {}", sql.sql);
    Ok(DDL(sql))
}

/// One indexed expression: the column or JSON path, made null-safe for
/// unique indexes and lowercased for collated ones.
fn translate_index_element(
    table: TableNameAndInfo,
    field: &str,
    options: &IndexOptions,
) -> Result<sql::ast::Expression, Error> {
    let (column_name, path) = split_field_path(field);
    let column = table.lookup_column(column_name)?;
    let column_expression = sql::helpers::make_unqualified_column(column_name);

    let (mut element, mut textual) = if path.is_empty() {
        (
            column_expression,
            column
                .r#type
                .scalar_type()
                .is_some_and(|scalar_type| scalar_type.is_textual()),
        )
    } else {
        if !column.r#type.scalar_type().is_some_and(|t| t.is_json()) {
            return Err(Error::NotAJsonColumn {
                table: table.name.to_string(),
                column: column_name.to_string(),
            });
        }
        let element = sql::ast::Expression::JsonPath {
            expression: Box::new(column_expression),
            path,
            as_text: false,
        };
        (element, false)
    };

    // NULLs never collide in a unique index, so they are indexed as ''
    if options.unique && column.is_nullable() {
        if !textual {
            element = sql::helpers::cast(element, ScalarType::Text.sql_name());
            textual = true;
        }
        element = sql::helpers::function_call(
            sql::ast::Function::Coalesce,
            vec![element, sql::ast::Expression::Value(sql::ast::Value::EmptyString)],
        );
    }

    if options.collation.is_some() {
        if !textual {
            element = sql::helpers::cast(element, ScalarType::Text.sql_name());
        }
        element = sql::helpers::function_call(sql::ast::Function::Lower, vec![element]);
    }

    Ok(element)
}

/// Translate an index into `DROP INDEX "<name>"`.
pub fn translate_drop_index(index: &TableIndex) -> DDL {
    let statement = sql::ast::DropIndex {
        name: sql::ast::IndexName(index.name()),
        if_exists: false,
    };
    let mut sql = SQL::new();
    statement.to_sql(&mut sql);
    DDL(sql)
}

/// Translate every index the metadata declares on a table.
pub fn translate_table_indexes(metadata: &Metadata, table_name: &str) -> Result<Vec<DDL>, Error> {
    let table = lookup_table(metadata, table_name)?;
    table
        .info
        .indexes
        .iter()
        .map(|info| translate_create_index(metadata, &TableIndex::from_info(table.name, info)))
        .collect()
}
