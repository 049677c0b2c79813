//! Helpers for building sql::ast types in certain shapes and patterns.

use super::ast::*;

// Empty clauses //

/// An empty `WHERE` clause.
pub fn empty_where() -> Expression {
    Expression::Value(Value::Bool(true))
}

/// An empty `ORDER BY` clause.
pub fn empty_order_by() -> OrderBy {
    OrderBy { elements: vec![] }
}

/// Empty `LIMIT` and `OFFSET` clauses.
pub fn empty_limit() -> Limit {
    Limit {
        limit: None,
        offset: None,
    }
}

/// A `true` expression.
pub fn true_expr() -> Expression {
    Expression::Value(Value::Bool(true))
}

/// A `false` expression.
pub fn false_expr() -> Expression {
    Expression::Value(Value::Bool(false))
}

// Expressions //

/// Combine expressions with AND. A single expression is returned as-is,
/// and no expressions at all is `true`.
pub fn and_all(mut expressions: Vec<Expression>) -> Expression {
    match expressions.len() {
        0 => true_expr(),
        1 => expressions.remove(0),
        _ => Expression::And(expressions),
    }
}

/// Combine expressions with OR. No expressions at all is `false`.
pub fn or_any(mut expressions: Vec<Expression>) -> Expression {
    match expressions.len() {
        0 => false_expr(),
        1 => expressions.remove(0),
        _ => Expression::Or(expressions),
    }
}

/// Build a binary operation.
pub fn binary(left: Expression, operator: BinaryOperator, right: Expression) -> Expression {
    Expression::BinaryOperation {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}

/// Build a unary operation.
pub fn unary(expression: Expression, operator: UnaryOperator) -> Expression {
    Expression::UnaryOperation {
        expression: Box::new(expression),
        operator,
    }
}

/// Build a scalar function call.
pub fn function_call(function: Function, args: Vec<Expression>) -> Expression {
    Expression::FunctionCall { function, args }
}

/// Cast an expression to a type.
pub fn cast(expression: Expression, type_name: &str) -> Expression {
    Expression::Cast {
        expression: Box::new(expression),
        r#type: ScalarType(type_name.to_string()),
    }
}

// Aliasing //

/// Create table aliases using this function so we build everything in one place.
pub fn make_table_alias(name: String) -> TableAlias {
    TableAlias { name }
}

/// Create column aliases using this function so we build everything in one place.
pub fn make_column_alias(name: String) -> ColumnAlias {
    ColumnAlias { name }
}

/// Generate a column expression refering to a specific table.
pub fn make_column(table: TableAlias, name: &str) -> Expression {
    Expression::ColumnReference(ColumnReference::TableColumn {
        table,
        name: ColumnName(name.to_string()),
    })
}

/// Generate a column expression without a table.
pub fn make_unqualified_column(name: &str) -> Expression {
    Expression::ColumnReference(ColumnReference::Unqualified(ColumnName(name.to_string())))
}

// Relations //

/// A related row as a JSON object, or NULL when there is no related row:
///
/// `CASE WHEN "q"."_id" IS NULL THEN NULL ELSE (TO_JSONB("q".*) || ..) END`
pub fn nullable_related_row(
    alias: TableAlias,
    primary_key: &str,
    row: Option<TableAlias>,
    fields: Vec<JsonbField>,
) -> Expression {
    Expression::Case {
        when: Box::new(unary(make_column(alias, primary_key), UnaryOperator::IsNull)),
        then: Box::new(Expression::Value(Value::Null)),
        else_: Box::new(Expression::JsonbObject { row, fields }),
    }
}

// SELECTs //

/// Build a select from a table with a select list and the rest are empty.
pub fn simple_select(table: TableName, alias: TableAlias, select_list: Vec<SelectItem>) -> Select {
    Select {
        comment: None,
        select_list: SelectList(select_list),
        from: Some(From::Table {
            reference: table,
            alias,
        }),
        joins: vec![],
        where_: Where(empty_where()),
        order_by: empty_order_by(),
        limit: empty_limit(),
    }
}
