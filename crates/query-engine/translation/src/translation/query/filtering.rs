//! Translate Mongo-style selectors into SQL boolean expressions.

use query_engine_metadata::metadata::{ColumnInfo, ScalarType, Type, PRIMARY_KEY};
use query_engine_sql::sql;
use query_engine_sql::sql::string::{Arguments, Param};
use serde_json::{Map, Value};

use crate::translation::error::Error;
use crate::translation::helpers::TableNameAndInfo;
use crate::translation::request::Selector;

/// The table a selector is evaluated against.
#[derive(Debug, Clone)]
pub struct SelectorTarget<'a> {
    pub table: TableNameAndInfo<'a>,
    /// Qualify columns with this alias. Index predicates use bare column names.
    pub alias: Option<sql::ast::TableAlias>,
    /// Compare textual values with `LOWER(..)` on both sides.
    pub case_insensitive: bool,
}

/// Translate a request selector.
pub fn translate_selector(
    target: &SelectorTarget,
    arguments: &mut Arguments,
    selector: &Selector,
) -> Result<sql::ast::Expression, Error> {
    match selector {
        Selector::Id(id) => {
            let mut filter = Map::new();
            filter.insert(PRIMARY_KEY.to_string(), Value::String(id.clone()));
            translate_filter(target, arguments, &filter)
        }
        Selector::Filter(filter) => translate_filter(target, arguments, filter),
    }
}

/// Translate a filter object. Its entries are ANDed together and their
/// values bound in key order.
pub fn translate_filter(
    target: &SelectorTarget,
    arguments: &mut Arguments,
    filter: &Map<String, Value>,
) -> Result<sql::ast::Expression, Error> {
    let mut conditions = vec![];
    for (key, value) in filter {
        match key.as_str() {
            "$and" => conditions.push(sql::helpers::and_all(translate_subfilters(
                target, arguments, key, value,
            )?)),
            "$or" => conditions.push(sql::helpers::or_any(translate_subfilters(
                target, arguments, key, value,
            )?)),
            "$comment" => {}
            operator if operator.starts_with('$') => {
                return Err(Error::UnsupportedOperator(operator.to_string()));
            }
            field => conditions.push(translate_field(target, arguments, field, value)?),
        }
    }
    Ok(sql::helpers::and_all(conditions))
}

/// The operands of `$and` and `$or`: an array of filters, or an object whose
/// entries each count as a separate filter.
fn translate_subfilters(
    target: &SelectorTarget,
    arguments: &mut Arguments,
    operator: &str,
    value: &Value,
) -> Result<Vec<sql::ast::Expression>, Error> {
    match value {
        Value::Array(filters) => filters
            .iter()
            .map(|filter| match filter {
                Value::Object(filter) => translate_filter(target, arguments, filter),
                _ => Err(invalid_operand(operator, "expected an array of objects")),
            })
            .collect(),
        Value::Object(filters) => filters
            .iter()
            .map(|(key, value)| {
                let mut filter = Map::new();
                filter.insert(key.clone(), value.clone());
                translate_filter(target, arguments, &filter)
            })
            .collect(),
        _ => Err(invalid_operand(operator, "expected an array or an object")),
    }
}

fn invalid_operand(operator: &str, message: &str) -> Error {
    Error::InvalidOperand {
        operator: operator.to_string(),
        message: message.to_string(),
    }
}

/// A column, or a JSON sub-path of a column, that a selector compares.
struct Operand<'a> {
    column: &'a ColumnInfo,
    column_expression: sql::ast::Expression,
    path: Vec<sql::ast::JsonPathElement>,
    case_insensitive: bool,
}

/// Split `c.d.0` into its column and a JSON path. Numeric steps index arrays.
pub fn split_field_path(field: &str) -> (&str, Vec<sql::ast::JsonPathElement>) {
    let mut steps = field.split('.');
    let column = steps.next().unwrap_or(field);
    let path = steps
        .map(|step| match step.parse::<u32>() {
            Ok(index) => sql::ast::JsonPathElement::Index(index),
            Err(_) => sql::ast::JsonPathElement::Key(step.to_string()),
        })
        .collect();
    (column, path)
}

impl<'a> Operand<'a> {
    fn new(target: &SelectorTarget<'a>, field: &str) -> Result<Self, Error> {
        let (column_name, path) = split_field_path(field);
        let column = target.table.lookup_column(column_name)?;
        if !path.is_empty() && !column.r#type.scalar_type().is_some_and(|t| t.is_json()) {
            return Err(Error::NotAJsonColumn {
                table: target.table.name.to_string(),
                column: column_name.to_string(),
            });
        }
        let column_expression = match &target.alias {
            Some(alias) => sql::helpers::make_column(alias.clone(), column_name),
            None => sql::helpers::make_unqualified_column(column_name),
        };
        Ok(Operand {
            column,
            column_expression,
            path,
            case_insensitive: target.case_insensitive,
        })
    }

    fn is_array(&self) -> bool {
        self.path.is_empty() && self.column.r#type.is_array()
    }

    /// The type of the elements of an array column.
    fn element_type(&self) -> Option<ScalarType> {
        match &self.column.r#type {
            Type::ArrayType(element) if self.path.is_empty() => element.scalar_type(),
            Type::ArrayType(_) | Type::ScalarType(_) => None,
        }
    }

    fn is_nullable(&self) -> bool {
        !self.path.is_empty() || self.column.is_nullable()
    }

    fn is_textual(&self, value: &Value) -> bool {
        value.is_string()
            && (!self.path.is_empty()
                || self
                    .column
                    .r#type
                    .scalar_type()
                    .is_some_and(|t| t.is_textual()))
    }

    fn lowercase(&self, value: &Value) -> bool {
        self.case_insensitive && self.is_textual(value)
    }

    /// The left hand side when comparing with `value`. JSON sub-paths are
    /// extracted as text for strings and nulls and cast to match other scalars.
    fn left(&self, value: &Value) -> sql::ast::Expression {
        let expression = if self.path.is_empty() {
            self.column_expression.clone()
        } else {
            let path = sql::ast::Expression::JsonPath {
                expression: Box::new(self.column_expression.clone()),
                path: self.path.clone(),
                as_text: matches!(value, Value::String(_) | Value::Null),
            };
            match value {
                Value::Number(number) if number.is_i64() || number.is_u64() => {
                    sql::helpers::cast(path, ScalarType::Integer.sql_name())
                }
                Value::Number(_) => {
                    sql::helpers::cast(path, ScalarType::DoublePrecision.sql_name())
                }
                Value::Bool(_) => sql::helpers::cast(path, ScalarType::Boolean.sql_name()),
                Value::Null | Value::String(_) | Value::Array(_) | Value::Object(_) => path,
            }
        };
        if self.lowercase(value) {
            lower(expression)
        } else {
            expression
        }
    }

    /// Bind `value` as the right hand side.
    fn right(&self, arguments: &mut Arguments, value: &Value) -> sql::ast::Expression {
        let placeholder = sql::ast::Expression::Placeholder(arguments.bind(Param::from(value)));
        if !self.path.is_empty() && matches!(value, Value::Array(_) | Value::Object(_)) {
            sql::helpers::cast(placeholder, ScalarType::Jsonb.sql_name())
        } else if self.lowercase(value) {
            lower(placeholder)
        } else {
            placeholder
        }
    }

    /// Bind `value` as an element of an array literal compared with an array
    /// column, cast to the column's element type: `ARRAY[ $1::INTEGER ]`.
    fn element(&self, arguments: &mut Arguments, value: &Value) -> sql::ast::Expression {
        let placeholder = sql::ast::Expression::Placeholder(arguments.bind(Param::from(value)));
        match self.element_type() {
            Some(element_type) => sql::helpers::cast(placeholder, element_type.sql_name()),
            None => placeholder,
        }
    }

    fn equals(&self, arguments: &mut Arguments, value: &Value) -> sql::ast::Expression {
        match value {
            Value::Null => sql::helpers::unary(self.left(value), sql::ast::UnaryOperator::IsNull),
            Value::Bool(true) => {
                sql::helpers::unary(self.left(value), sql::ast::UnaryOperator::IsTrue)
            }
            Value::Bool(false) => {
                sql::helpers::unary(self.left(value), sql::ast::UnaryOperator::IsFalse)
            }
            _ if self.is_array() && !value.is_array() => sql::helpers::binary(
                self.left(value),
                sql::ast::BinaryOperator::Contains,
                sql::ast::Expression::ArrayConstructor(vec![self.element(arguments, value)]),
            ),
            _ => sql::helpers::binary(
                self.left(value),
                sql::ast::BinaryOperator::Equals,
                self.right(arguments, value),
            ),
        }
    }

    fn not_equals(&self, arguments: &mut Arguments, value: &Value) -> sql::ast::Expression {
        match value {
            Value::Null => {
                sql::helpers::unary(self.left(value), sql::ast::UnaryOperator::IsNotNull)
            }
            Value::Bool(true) => {
                sql::helpers::unary(self.left(value), sql::ast::UnaryOperator::IsNotTrue)
            }
            Value::Bool(false) => {
                sql::helpers::unary(self.left(value), sql::ast::UnaryOperator::IsNotFalse)
            }
            _ if self.is_array() && !value.is_array() => {
                sql::ast::Expression::Not(Box::new(self.equals(arguments, value)))
            }
            _ => sql::helpers::binary(
                self.left(value),
                if self.is_nullable() {
                    sql::ast::BinaryOperator::IsDistinctFrom
                } else {
                    sql::ast::BinaryOperator::NotEquals
                },
                self.right(arguments, value),
            ),
        }
    }

    fn compare(
        &self,
        arguments: &mut Arguments,
        operator: &str,
        sql_operator: sql::ast::BinaryOperator,
        value: &Value,
    ) -> Result<sql::ast::Expression, Error> {
        match value {
            Value::Null | Value::Array(_) | Value::Object(_) => {
                Err(invalid_operand(operator, "expected a scalar value"))
            }
            _ => Ok(sql::helpers::binary(
                self.left(value),
                sql_operator,
                self.right(arguments, value),
            )),
        }
    }

    fn is_in(
        &self,
        arguments: &mut Arguments,
        operator: &str,
        value: &Value,
    ) -> Result<sql::ast::Expression, Error> {
        let Value::Array(values) = value else {
            return Err(invalid_operand(operator, "expected an array"));
        };
        let Some(first) = values.first() else {
            return Ok(sql::helpers::false_expr());
        };
        if self.is_array() {
            let items = values
                .iter()
                .map(|item| self.element(arguments, item))
                .collect();
            // any element in common
            return Ok(sql::helpers::binary(
                self.left(first),
                sql::ast::BinaryOperator::Overlaps,
                sql::ast::Expression::ArrayConstructor(items),
            ));
        }
        let items = values
            .iter()
            .map(|item| self.right(arguments, item))
            .collect();
        Ok(sql::ast::Expression::BinaryArrayOperation {
            left: Box::new(self.left(first)),
            operator: sql::ast::BinaryArrayOperator::In,
            right: items,
        })
    }

    fn contains_all(
        &self,
        arguments: &mut Arguments,
        operator: &str,
        value: &Value,
    ) -> Result<sql::ast::Expression, Error> {
        let Value::Array(values) = value else {
            return Err(invalid_operand(operator, "expected an array"));
        };
        if !self.is_array() && self.path.is_empty() {
            return Err(invalid_operand(operator, "expected an array or JSON field"));
        }
        // like `$in`, an empty list matches nothing
        if values.is_empty() {
            return Ok(sql::helpers::false_expr());
        }
        if self.is_array() {
            let items = values
                .iter()
                .map(|item| self.element(arguments, item))
                .collect();
            Ok(sql::helpers::binary(
                self.left(value),
                sql::ast::BinaryOperator::Contains,
                sql::ast::Expression::ArrayConstructor(items),
            ))
        } else {
            Ok(sql::helpers::binary(
                self.left(value),
                sql::ast::BinaryOperator::Contains,
                self.right(arguments, value),
            ))
        }
    }

    fn size(
        &self,
        arguments: &mut Arguments,
        operator: &str,
        value: &Value,
    ) -> Result<sql::ast::Expression, Error> {
        if !self.is_array() {
            return Err(invalid_operand(operator, "expected an array field"));
        }
        if !value.is_u64() {
            return Err(invalid_operand(operator, "expected a non-negative integer"));
        }
        Ok(sql::helpers::binary(
            sql::helpers::function_call(
                sql::ast::Function::ArrayLength,
                vec![
                    self.column_expression.clone(),
                    sql::ast::Expression::Value(sql::ast::Value::Int4(1)),
                ],
            ),
            sql::ast::BinaryOperator::Equals,
            self.right(arguments, value),
        ))
    }

    /// Translate `{"$op": value, ..}`. Several operators are ANDed.
    fn operators(
        &self,
        arguments: &mut Arguments,
        operators: &Map<String, Value>,
    ) -> Result<sql::ast::Expression, Error> {
        let mut conditions = vec![];
        for (operator, value) in operators {
            let condition = match operator.as_str() {
                "$eq" => self.equals(arguments, value),
                "$ne" => self.not_equals(arguments, value),
                "$lt" => {
                    self.compare(arguments, operator, sql::ast::BinaryOperator::LessThan, value)?
                }
                "$lte" => self.compare(
                    arguments,
                    operator,
                    sql::ast::BinaryOperator::LessThanOrEqualTo,
                    value,
                )?,
                "$gt" => self.compare(
                    arguments,
                    operator,
                    sql::ast::BinaryOperator::GreaterThan,
                    value,
                )?,
                "$gte" => self.compare(
                    arguments,
                    operator,
                    sql::ast::BinaryOperator::GreaterThanOrEqualTo,
                    value,
                )?,
                "$in" => self.is_in(arguments, operator, value)?,
                "$nin" => match self.is_in(arguments, operator, value)? {
                    empty if empty == sql::helpers::false_expr() => sql::helpers::true_expr(),
                    expression => sql::ast::Expression::Not(Box::new(expression)),
                },
                "$all" => self.contains_all(arguments, operator, value)?,
                "$exists" => match value {
                    Value::Bool(exists) => sql::helpers::unary(
                        self.left(&Value::Null),
                        if *exists {
                            sql::ast::UnaryOperator::IsNotNull
                        } else {
                            sql::ast::UnaryOperator::IsNull
                        },
                    ),
                    _ => return Err(invalid_operand(operator, "expected a boolean")),
                },
                "$not" => match value {
                    Value::Object(inner) if is_operator_object(inner) => {
                        sql::ast::Expression::Not(Box::new(self.operators(arguments, inner)?))
                    }
                    _ => return Err(invalid_operand(operator, "expected an operator object")),
                },
                "$size" => self.size(arguments, operator, value)?,
                _ => return Err(Error::UnsupportedOperator(operator.clone())),
            };
            conditions.push(condition);
        }
        Ok(sql::helpers::and_all(conditions))
    }
}

fn lower(expression: sql::ast::Expression) -> sql::ast::Expression {
    sql::helpers::function_call(sql::ast::Function::Lower, vec![expression])
}

/// `{"$gt": 3}` rather than a JSON object value.
fn is_operator_object(object: &Map<String, Value>) -> bool {
    !object.is_empty() && object.keys().all(|key| key.starts_with('$'))
}

fn translate_field(
    target: &SelectorTarget,
    arguments: &mut Arguments,
    field: &str,
    value: &Value,
) -> Result<sql::ast::Expression, Error> {
    let operand = Operand::new(target, field)?;
    match value {
        Value::Object(operators) if is_operator_object(operators) => {
            operand.operators(arguments, operators)
        }
        _ => Ok(operand.equals(arguments, value)),
    }
}
