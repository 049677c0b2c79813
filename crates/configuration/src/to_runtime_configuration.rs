//! Convert a parsed configuration into a runtime configuration, validating the metadata on the way.

use query_engine_metadata::metadata::{
    ComputedExpression, FieldKind, FieldSelection, JoinOperand, JoinSpec, Metadata, TableInfo,
    PRIMARY_KEY,
};

use crate::configuration::Configuration;
use crate::error::{MakeRuntimeConfigurationError, MetadataError};
use crate::version1::ParsedConfiguration;

/// Validate the metadata and produce the configuration used at runtime.
pub fn make_runtime_configuration(
    parsed_config: ParsedConfiguration,
) -> Result<Configuration, MakeRuntimeConfigurationError> {
    let mut errors = validate_metadata(&parsed_config.metadata);
    let current_user_table = &parsed_config.settings.current_user_table;
    if !parsed_config
        .metadata
        .tables
        .0
        .contains_key(current_user_table)
    {
        errors.push(MetadataError::UnknownCurrentUserTable(
            current_user_table.clone(),
        ));
    }
    if !errors.is_empty() {
        return Err(MakeRuntimeConfigurationError::InvalidMetadata(errors));
    }

    tracing::info!(
        "loaded metadata with {} tables and {} fragments",
        parsed_config.metadata.tables.0.len(),
        parsed_config.metadata.fragments.0.len()
    );

    Ok(Configuration {
        metadata: parsed_config.metadata,
        settings: parsed_config.settings,
    })
}

/// Check every reference in the metadata. Returns all problems found.
pub fn validate_metadata(metadata: &Metadata) -> Vec<MetadataError> {
    let mut errors = vec![];

    for (table_name, table) in &metadata.tables.0 {
        if table.column(PRIMARY_KEY).is_none() {
            errors.push(MetadataError::MissingPrimaryKey(table_name.clone()));
        }

        for (field_name, field) in &table.fields {
            let field_context = FieldContext {
                metadata,
                table_name,
                table,
                field_name,
            };
            match &field.kind {
                FieldKind::Column(_) => {}
                FieldKind::Computed(computed) => {
                    field_context.validate_expression(&computed.expression, &mut errors);
                }
                FieldKind::Relation(relation) => {
                    field_context.validate_join(&relation.join, &mut errors);
                }
            }
        }

        for index in &table.indexes {
            for field in index.fields.keys() {
                let column = field.split('.').next().unwrap_or(field);
                if table.column(column).is_none() {
                    errors.push(MetadataError::UnknownIndexColumn {
                        table: table_name.clone(),
                        column: column.to_string(),
                    });
                }
            }
        }
    }

    for (fragment_name, fragment) in &metadata.fragments.0 {
        let Some(table) = metadata.tables.0.get(&fragment.table) else {
            errors.push(MetadataError::UnknownFragmentTable {
                fragment: fragment_name.clone(),
                table: fragment.table.clone(),
            });
            continue;
        };

        for selection in &fragment.fields {
            match (table.fields.get(selection.name()), selection) {
                (None, _) => errors.push(MetadataError::UnknownFragmentField {
                    fragment: fragment_name.clone(),
                    field: selection.name().to_string(),
                }),
                (Some(_), FieldSelection::Field(_)) => {}
                (Some(field), FieldSelection::Nested { name, fragment }) => {
                    if !matches!(field.kind, FieldKind::Relation(_)) {
                        errors.push(MetadataError::NestedFragmentOnNonRelation {
                            fragment: fragment_name.clone(),
                            field: name.clone(),
                        });
                    }
                    if !metadata.fragments.0.contains_key(fragment) {
                        errors.push(MetadataError::UnknownNestedFragment {
                            fragment: fragment_name.clone(),
                            field: name.clone(),
                            nested: fragment.clone(),
                        });
                    }
                }
            }
        }
    }

    errors
}

/// The field whose definition is being validated.
struct FieldContext<'a> {
    metadata: &'a Metadata,
    table_name: &'a str,
    table: &'a TableInfo,
    field_name: &'a str,
}

impl FieldContext<'_> {
    fn unknown_column(&self, referenced_table: &str, column: &str) -> MetadataError {
        MetadataError::UnknownColumn {
            table: self.table_name.to_string(),
            field: self.field_name.to_string(),
            referenced_table: referenced_table.to_string(),
            column: column.to_string(),
        }
    }

    fn validate_local_column(&self, column: &str, errors: &mut Vec<MetadataError>) {
        if self.table.column(column).is_none() {
            errors.push(self.unknown_column(self.table_name, column));
        }
    }

    /// Validate a join, returning the joined table when it exists.
    fn validate_join<'b>(
        &'b self,
        join: &JoinSpec,
        errors: &mut Vec<MetadataError>,
    ) -> Option<&'b TableInfo> {
        for operand in join.on.values() {
            if let JoinOperand::Column(column) = operand {
                self.validate_local_column(column, errors);
            }
        }

        let Some(joined_table) = self.metadata.tables.0.get(&join.table) else {
            errors.push(MetadataError::UnknownTable {
                table: self.table_name.to_string(),
                field: self.field_name.to_string(),
                referenced: join.table.clone(),
            });
            return None;
        };

        for remote_column in join.on.keys() {
            if joined_table.column(remote_column).is_none() {
                errors.push(self.unknown_column(&join.table, remote_column));
            }
        }
        Some(joined_table)
    }

    fn validate_expression(&self, expression: &ComputedExpression, errors: &mut Vec<MetadataError>) {
        match expression {
            ComputedExpression::Column(column) => self.validate_local_column(column, errors),
            ComputedExpression::CurrentUserColumn(_)
            | ComputedExpression::ResolverArg(_)
            | ComputedExpression::Value(_) => {}
            ComputedExpression::JoinedColumn { join, column } => {
                if let Some(joined_table) = self.validate_join(join, errors) {
                    if joined_table.column(column).is_none() {
                        errors.push(self.unknown_column(&join.table, column));
                    }
                }
            }
            ComputedExpression::JoinedRow { join } => {
                self.validate_join(join, errors);
            }
            ComputedExpression::FunctionCall {
                function,
                arguments,
            } => {
                if !is_identifier(function) {
                    errors.push(MetadataError::InvalidFunctionName {
                        table: self.table_name.to_string(),
                        field: self.field_name.to_string(),
                        function: function.clone(),
                    });
                }
                for argument in arguments {
                    self.validate_expression(argument, errors);
                }
            }
            ComputedExpression::BinaryOperation { left, right, .. } => {
                self.validate_expression(left, errors);
                self.validate_expression(right, errors);
            }
            ComputedExpression::IsNull(inner) => self.validate_expression(inner, errors),
        }
    }
}

/// Function names are emitted verbatim, so only plain SQL identifiers are allowed.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
