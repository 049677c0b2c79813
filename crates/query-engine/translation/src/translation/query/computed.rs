//! Translate the expressions of computed fields.

use fragment_sql_configuration::to_runtime_configuration::is_identifier;
use query_engine_metadata::metadata::{ComputedExpression, ComputedOperator, PRIMARY_KEY};
use query_engine_sql::sql;
use query_engine_sql::sql::string::Param;

use super::context::ProjectionContext;
use crate::translation::error::Error;
use crate::translation::helpers::AliasGenerator;

/// Translate a computed field's expression in the given context, registering
/// the joins it reads from.
pub fn translate_computed_expression(
    context: &mut ProjectionContext<'_>,
    expression: &ComputedExpression,
    aliases: &mut dyn AliasGenerator,
) -> Result<sql::ast::Expression, Error> {
    match expression {
        ComputedExpression::Column(column) => {
            context.table().lookup_column(column)?;
            Ok(context.absolute_field(column))
        }
        ComputedExpression::CurrentUserColumn(column) => context.current_user_field(column),
        ComputedExpression::ResolverArg(name) => Ok(context.resolver_arg(name)),
        ComputedExpression::Value(value) => Ok(sql::ast::Expression::Placeholder(
            context.add_arg(Param::from(value)),
        )),
        ComputedExpression::JoinedColumn { join, column } => {
            let alias = context.add_join(join, aliases)?;
            Ok(sql::helpers::make_column(alias, column))
        }
        ComputedExpression::JoinedRow { join } => {
            let alias = context.add_join(join, aliases)?;
            Ok(sql::helpers::nullable_related_row(
                alias.clone(),
                PRIMARY_KEY,
                Some(alias),
                vec![],
            ))
        }
        ComputedExpression::FunctionCall {
            function,
            arguments,
        } => {
            let function = translate_function(function)?;
            let mut args = Vec::with_capacity(arguments.len());
            for argument in arguments {
                args.push(translate_computed_expression(context, argument, aliases)?);
            }
            Ok(sql::helpers::function_call(function, args))
        }
        ComputedExpression::BinaryOperation {
            left,
            operator,
            right,
        } => {
            let left = translate_computed_expression(context, left, aliases)?;
            let right = translate_computed_expression(context, right, aliases)?;
            Ok(sql::helpers::binary(left, translate_operator(*operator), right))
        }
        ComputedExpression::IsNull(expression) => {
            let expression = translate_computed_expression(context, expression, aliases)?;
            Ok(sql::helpers::unary(
                expression,
                sql::ast::UnaryOperator::IsNull,
            ))
        }
    }
}

fn translate_function(name: &str) -> Result<sql::ast::Function, Error> {
    if !is_identifier(name) {
        return Err(Error::InvalidFunctionName(name.to_string()));
    }
    Ok(match name.to_uppercase().as_str() {
        "COALESCE" => sql::ast::Function::Coalesce,
        "LOWER" => sql::ast::Function::Lower,
        "ARRAY_LENGTH" => sql::ast::Function::ArrayLength,
        _ => sql::ast::Function::Unknown(name.to_string()),
    })
}

fn translate_operator(operator: ComputedOperator) -> sql::ast::BinaryOperator {
    match operator {
        ComputedOperator::Equals => sql::ast::BinaryOperator::Equals,
        ComputedOperator::NotEquals => sql::ast::BinaryOperator::NotEquals,
        ComputedOperator::LessThan => sql::ast::BinaryOperator::LessThan,
        ComputedOperator::LessThanOrEqualTo => sql::ast::BinaryOperator::LessThanOrEqualTo,
        ComputedOperator::GreaterThan => sql::ast::BinaryOperator::GreaterThan,
        ComputedOperator::GreaterThanOrEqualTo => sql::ast::BinaryOperator::GreaterThanOrEqualTo,
        ComputedOperator::Plus => sql::ast::BinaryOperator::Plus,
        ComputedOperator::Minus => sql::ast::BinaryOperator::Minus,
        ComputedOperator::Multiply => sql::ast::BinaryOperator::Multiply,
        ComputedOperator::Divide => sql::ast::BinaryOperator::Divide,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use query_engine_metadata::metadata::TableInfo;
    use query_engine_sql::sql::string::SQL;

    use crate::translation::helpers::{SequentialAliasGenerator, TableNameAndInfo};

    fn table_info() -> TableInfo {
        serde_json::from_value(serde_json::json!({
            "fields": {
                "_id": { "kind": "column", "type": { "scalar_type": "text" }, "nullable": "NonNullable" },
                "userId": { "kind": "column", "type": { "scalar_type": "text" } },
                "a": { "kind": "column", "type": { "scalar_type": "integer" } },
                "b": { "kind": "column", "type": { "scalar_type": "integer" } },
                "c": { "kind": "column", "type": { "scalar_type": "integer" } }
            }
        }))
        .unwrap()
    }

    /// Translate an expression over `TestCollection` and render it, its
    /// arguments and the joins it registered.
    fn translate(
        expression: serde_json::Value,
    ) -> Result<(String, Vec<Param>, Vec<String>), Error> {
        let expression: ComputedExpression = serde_json::from_value(expression).unwrap();
        let info = table_info();
        let args = IndexMap::new();
        let table = TableNameAndInfo {
            name: "TestCollection",
            info: &info,
        };
        let mut context = ProjectionContext::new(table, "Users", &args);
        let mut aliases = SequentialAliasGenerator::new();
        let expression = translate_computed_expression(&mut context, &expression, &mut aliases)?;

        let mut sql = SQL::new();
        expression.to_sql(&mut sql);
        let joins = context
            .joins()
            .map(|join| {
                let mut sql = SQL::new();
                join.to_sql(&mut sql);
                sql.sql
            })
            .collect();
        Ok((sql.sql, context.args().to_vec(), joins))
    }

    #[test]
    fn test_arithmetic_keeps_its_grouping() {
        let (sql, params, joins) = translate(serde_json::json!({
            "binary_operation": {
                "left": {
                    "binary_operation": {
                        "left": { "column": "a" },
                        "operator": "plus",
                        "right": { "column": "b" }
                    }
                },
                "operator": "multiply",
                "right": { "value": 2 }
            }
        }))
        .unwrap();
        assert_eq!(sql, r#"( "t"."a" + "t"."b" ) * $1"#);
        assert_eq!(params, vec![Param::Integer(2)]);
        assert!(joins.is_empty());

        let (sql, _, _) = translate(serde_json::json!({
            "binary_operation": {
                "left": { "column": "a" },
                "operator": "minus",
                "right": {
                    "binary_operation": {
                        "left": { "column": "b" },
                        "operator": "divide",
                        "right": { "column": "c" }
                    }
                }
            }
        }))
        .unwrap();
        assert_eq!(sql, r#""t"."a" - ( "t"."b" / "t"."c" )"#);
    }

    #[test]
    fn test_is_null_of_a_comparison() {
        let (sql, params, _) = translate(serde_json::json!({
            "is_null": {
                "binary_operation": {
                    "left": { "column": "a" },
                    "operator": "equals",
                    "right": { "column": "b" }
                }
            }
        }))
        .unwrap();
        assert_eq!(sql, r#"( "t"."a" = "t"."b" ) IS NULL"#);
        assert!(params.is_empty());

        let (sql, _, _) = translate(serde_json::json!({ "is_null": { "column": "c" } })).unwrap();
        assert_eq!(sql, r#""t"."c" IS NULL"#);
    }

    #[test]
    fn test_joined_row_registers_its_join() {
        let (sql, _, joins) = translate(serde_json::json!({
            "joined_row": {
                "join": { "table": "Users", "on": { "_id": { "column": "userId" } } }
            }
        }))
        .unwrap();
        assert_eq!(
            sql,
            r#"CASE WHEN "j1"."_id" IS NULL THEN NULL ELSE (TO_JSONB("j1".*)) END"#
        );
        assert_eq!(
            joins,
            vec![r#"LEFT JOIN "Users" "j1" ON "j1"."_id" = "t"."userId""#.to_string()]
        );
    }

    #[test]
    fn test_inner_join_is_shared_by_equal_specs() {
        let join = serde_json::json!({
            "table": "Users",
            "join_type": "inner",
            "on": { "_id": { "column": "userId" } }
        });
        let (sql, _, joins) = translate(serde_json::json!({
            "function_call": {
                "function": "coalesce",
                "arguments": [
                    { "joined_column": { "join": join, "column": "displayName" } },
                    { "joined_column": { "join": join, "column": "username" } }
                ]
            }
        }))
        .unwrap();
        assert_eq!(sql, r#"COALESCE("j1"."displayName", "j1"."username")"#);
        assert_eq!(
            joins,
            vec![r#"INNER JOIN "Users" "j1" ON "j1"."_id" = "t"."userId""#.to_string()]
        );
    }

    #[test]
    fn test_unknown_columns_are_rejected() {
        assert_eq!(
            translate(serde_json::json!({ "is_null": { "column": "missing" } })),
            Err(Error::ColumnNotFound {
                table: "TestCollection".to_string(),
                column: "missing".to_string(),
            })
        );
    }

    #[test]
    fn test_function_names_must_be_identifiers() {
        assert_eq!(
            translate_function("coalesce"),
            Ok(sql::ast::Function::Coalesce)
        );
        assert_eq!(
            translate_function("GREATEST"),
            Ok(sql::ast::Function::Unknown("GREATEST".to_string()))
        );
        assert_eq!(
            translate_function("NOW(); DROP TABLE x; --"),
            Err(Error::InvalidFunctionName(
                "NOW(); DROP TABLE x; --".to_string()
            ))
        );
    }
}
