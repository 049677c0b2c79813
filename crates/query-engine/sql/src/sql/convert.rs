//! Convert a SQL AST to a low-level SQL string.

use super::ast::*;
use super::helpers;
use super::string::SQL;

/// Postgres functions take at most 100 arguments, so a `JSONB_BUILD_OBJECT`
/// call can hold at most 50 key/value pairs.
const MAX_JSONB_BUILD_OBJECT_PAIRS: usize = 50;

// Convert to SQL strings

impl Select {
    pub fn to_sql(&self, sql: &mut SQL) {
        if let Some(Comment(comment)) = &self.comment {
            sql.append_comment(comment);
        }

        sql.append_syntax("SELECT ");
        self.select_list.to_sql(sql);

        if let Some(from) = &self.from {
            sql.append_syntax(" FROM ");
            from.to_sql(sql);
        }

        for join in &self.joins {
            sql.append_syntax(" ");
            join.to_sql(sql);
        }

        self.where_.to_sql(sql);
        self.order_by.to_sql(sql);
        self.limit.to_sql(sql);
    }
}

impl SelectList {
    pub fn to_sql(&self, sql: &mut SQL) {
        let SelectList(items) = self;
        for (index, item) in items.iter().enumerate() {
            item.to_sql(sql);
            if index < (items.len() - 1) {
                sql.append_syntax(", ");
            }
        }
    }
}

impl SelectItem {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            SelectItem::Star(table) => {
                table.to_sql(sql);
                sql.append_syntax(".*");
            }
            SelectItem::Column(column) => column.to_sql(sql),
            SelectItem::Expression { expression, alias } => {
                expression.to_sql(sql);
                sql.append_syntax(" ");
                alias.to_sql(sql);
            }
        }
    }
}

impl From {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            From::Table { reference, alias } => {
                reference.to_sql(sql);
                sql.append_syntax(" ");
                alias.to_sql(sql);
            }
        }
    }
}

impl Join {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            Join::LeftOuterJoin(join) => {
                sql.append_syntax("LEFT JOIN ");
                join.to_sql(sql);
            }
            Join::InnerJoin(join) => {
                sql.append_syntax("INNER JOIN ");
                join.to_sql(sql);
            }
        }
    }
}

impl TableJoin {
    pub fn to_sql(&self, sql: &mut SQL) {
        self.table.to_sql(sql);
        sql.append_syntax(" ");
        self.alias.to_sql(sql);
        sql.append_syntax(" ON ");
        if self.on.is_empty() {
            sql.append_syntax("TRUE");
        }
        for (index, condition) in self.on.iter().enumerate() {
            condition.to_sql(sql);
            if index < (self.on.len() - 1) {
                sql.append_syntax(" AND ");
            }
        }
    }
}

impl Where {
    pub fn to_sql(&self, sql: &mut SQL) {
        let Where(expression) = self;
        if *expression != helpers::true_expr() {
            sql.append_syntax(" WHERE ");
            expression.to_sql(sql);
        }
    }
}

impl OrderBy {
    pub fn to_sql(&self, sql: &mut SQL) {
        if !self.elements.is_empty() {
            sql.append_syntax(" ORDER BY ");
            for (index, element) in self.elements.iter().enumerate() {
                element.to_sql(sql);
                if index < (self.elements.len() - 1) {
                    sql.append_syntax(", ");
                }
            }
        }
    }
}

impl OrderByElement {
    pub fn to_sql(&self, sql: &mut SQL) {
        self.target.to_sql(sql);
        self.direction.to_sql(sql);
        match self.nulls {
            None => {}
            Some(NullsOrder::First) => sql.append_syntax(" NULLS FIRST"),
            Some(NullsOrder::Last) => sql.append_syntax(" NULLS LAST"),
        }
    }
}

impl OrderByDirection {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            OrderByDirection::Asc => sql.append_syntax(" ASC"),
            OrderByDirection::Desc => sql.append_syntax(" DESC"),
        }
    }
}

impl Limit {
    pub fn to_sql(&self, sql: &mut SQL) {
        if let Some(limit) = self.limit {
            sql.append_syntax(" LIMIT ");
            sql.append_placeholder(limit);
        }
        if let Some(offset) = self.offset {
            sql.append_syntax(" OFFSET ");
            sql.append_placeholder(offset);
        }
    }
}

impl CreateIndex {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("CREATE ");
        if self.unique {
            sql.append_syntax("UNIQUE ");
        }
        sql.append_syntax("INDEX ");
        if self.concurrently {
            sql.append_syntax("CONCURRENTLY ");
        }
        if self.if_not_exists {
            sql.append_syntax("IF NOT EXISTS ");
        }
        self.name.to_sql(sql);
        sql.append_syntax(" ON ");
        self.table.to_sql(sql);
        sql.append_syntax(" USING ");
        self.method.to_sql(sql);
        sql.append_syntax(" ( ");
        for (index, element) in self.elements.iter().enumerate() {
            element.to_sql(sql);
            if index < (self.elements.len() - 1) {
                sql.append_syntax(" , ");
            }
        }
        sql.append_syntax(" )");
        self.where_.to_sql(sql);
    }
}

impl DropIndex {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("DROP INDEX ");
        if self.if_exists {
            sql.append_syntax("IF EXISTS ");
        }
        self.name.to_sql(sql);
    }
}

impl IndexMethod {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            IndexMethod::Btree => sql.append_syntax("btree"),
            IndexMethod::Gin => sql.append_syntax("gin"),
        }
    }
}

impl Expression {
    pub fn to_sql(&self, sql: &mut SQL) {
        match &self {
            Expression::And(expressions) => {
                connective_to_sql(expressions, " AND ", "TRUE", sql);
            }
            Expression::Or(expressions) => {
                connective_to_sql(expressions, " OR ", "FALSE", sql);
            }
            Expression::Not(expr) => {
                sql.append_syntax("NOT ( ");
                expr.to_sql(sql);
                sql.append_syntax(" )");
            }
            Expression::BinaryOperation {
                left,
                operator,
                right,
            } => {
                operand_to_sql(left, sql);
                operator.to_sql(sql);
                operand_to_sql(right, sql);
            }
            Expression::BinaryArrayOperation {
                left,
                operator,
                right,
            } => {
                left.to_sql(sql);
                operator.to_sql(sql);
                sql.append_syntax("( ");
                for (index, item) in right.iter().enumerate() {
                    item.to_sql(sql);
                    if index < (right.len() - 1) {
                        sql.append_syntax(" , ");
                    }
                }
                sql.append_syntax(" )");
            }
            Expression::UnaryOperation {
                expression,
                operator,
            } => {
                operand_to_sql(expression, sql);
                operator.to_sql(sql);
            }
            Expression::FunctionCall { function, args } => {
                function.to_sql(sql);
                sql.append_syntax("(");
                for (index, arg) in args.iter().enumerate() {
                    arg.to_sql(sql);
                    if index < (args.len() - 1) {
                        sql.append_syntax(", ");
                    }
                }
                sql.append_syntax(")");
            }
            Expression::ArrayConstructor(items) => {
                sql.append_syntax("ARRAY[ ");
                for (index, item) in items.iter().enumerate() {
                    item.to_sql(sql);
                    if index < (items.len() - 1) {
                        sql.append_syntax(" , ");
                    }
                }
                sql.append_syntax(" ]");
            }
            Expression::ColumnReference(column) => column.to_sql(sql),
            Expression::JsonPath {
                expression,
                path,
                as_text,
            } => {
                sql.append_syntax("(");
                expression.to_sql(sql);
                for (index, element) in path.iter().enumerate() {
                    if *as_text && index == path.len() - 1 {
                        sql.append_syntax("->>");
                    } else {
                        sql.append_syntax("->");
                    }
                    element.to_sql(sql);
                }
                sql.append_syntax(")");
            }
            Expression::Case { when, then, else_ } => {
                sql.append_syntax("CASE WHEN ");
                when.to_sql(sql);
                sql.append_syntax(" THEN ");
                then.to_sql(sql);
                sql.append_syntax(" ELSE ");
                else_.to_sql(sql);
                sql.append_syntax(" END");
            }
            Expression::JsonbObject { row, fields } => {
                sql.append_syntax("(");
                let mut first = true;
                if let Some(row) = row {
                    sql.append_syntax("TO_JSONB(");
                    row.to_sql(sql);
                    sql.append_syntax(".*)");
                    first = false;
                }
                for chunk in fields.chunks(MAX_JSONB_BUILD_OBJECT_PAIRS) {
                    if !first {
                        sql.append_syntax(" || ");
                    }
                    first = false;
                    sql.append_syntax("JSONB_BUILD_OBJECT( ");
                    for (index, field) in chunk.iter().enumerate() {
                        field.to_sql(sql);
                        if index < (chunk.len() - 1) {
                            sql.append_syntax(", ");
                        }
                    }
                    sql.append_syntax(" )");
                }
                if first {
                    sql.append_syntax("'{}'::JSONB");
                }
                sql.append_syntax(")");
            }
            Expression::Cast { expression, r#type } => {
                operand_to_sql(expression, sql);
                sql.append_syntax("::");
                r#type.to_sql(sql);
            }
            Expression::Value(value) => value.to_sql(sql),
            Expression::Placeholder(placeholder) => sql.append_placeholder(*placeholder),
        }
    }
}

/// Operators bind differently in SQL than in the AST, so an operand that is
/// itself an operation is grouped: `( "a" + "b" ) * "c"`.
fn operand_to_sql(expression: &Expression, sql: &mut SQL) {
    match expression {
        Expression::BinaryOperation { .. }
        | Expression::BinaryArrayOperation { .. }
        | Expression::UnaryOperation { .. }
        | Expression::Not(_) => {
            sql.append_syntax("( ");
            expression.to_sql(sql);
            sql.append_syntax(" )");
        }
        _ => expression.to_sql(sql),
    }
}

fn connective_to_sql(expressions: &[Expression], connective: &str, unit: &str, sql: &mut SQL) {
    if expressions.is_empty() {
        sql.append_syntax(unit);
        return;
    }
    sql.append_syntax("( ");
    for (index, expression) in expressions.iter().enumerate() {
        expression.to_sql(sql);
        if index < (expressions.len() - 1) {
            sql.append_syntax(connective);
        }
    }
    sql.append_syntax(" )");
}

impl JsonbField {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_string_literal(&self.key.name);
        sql.append_syntax(", ");
        self.value.to_sql(sql);
    }
}

impl JsonPathElement {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            JsonPathElement::Key(key) => sql.append_string_literal(key),
            JsonPathElement::Index(index) => sql.append_syntax(&index.to_string()),
        }
    }
}

impl UnaryOperator {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            UnaryOperator::IsNull => sql.append_syntax(" IS NULL"),
            UnaryOperator::IsNotNull => sql.append_syntax(" IS NOT NULL"),
            UnaryOperator::IsTrue => sql.append_syntax(" IS TRUE"),
            UnaryOperator::IsNotTrue => sql.append_syntax(" IS NOT TRUE"),
            UnaryOperator::IsFalse => sql.append_syntax(" IS FALSE"),
            UnaryOperator::IsNotFalse => sql.append_syntax(" IS NOT FALSE"),
        }
    }
}

impl BinaryOperator {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax(match self {
            BinaryOperator::Equals => " = ",
            BinaryOperator::NotEquals => " <> ",
            BinaryOperator::IsDistinctFrom => " IS DISTINCT FROM ",
            BinaryOperator::LessThan => " < ",
            BinaryOperator::LessThanOrEqualTo => " <= ",
            BinaryOperator::GreaterThan => " > ",
            BinaryOperator::GreaterThanOrEqualTo => " >= ",
            BinaryOperator::Contains => " @> ",
            BinaryOperator::Overlaps => " && ",
            BinaryOperator::Plus => " + ",
            BinaryOperator::Minus => " - ",
            BinaryOperator::Multiply => " * ",
            BinaryOperator::Divide => " / ",
        });
    }
}

impl BinaryArrayOperator {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            BinaryArrayOperator::In => sql.append_syntax(" IN "),
        }
    }
}

impl Function {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            Function::Coalesce => sql.append_syntax("COALESCE"),
            Function::Lower => sql.append_syntax("LOWER"),
            Function::ArrayLength => sql.append_syntax("ARRAY_LENGTH"),
            Function::Unknown(name) => sql.append_syntax(name),
        }
    }
}

impl Value {
    pub fn to_sql(&self, sql: &mut SQL) {
        match &self {
            Value::Null => sql.append_syntax("NULL"),
            Value::Bool(true) => sql.append_syntax("TRUE"),
            Value::Bool(false) => sql.append_syntax("FALSE"),
            Value::Int4(i) => sql.append_syntax(&i.to_string()),
            Value::EmptyString => sql.append_syntax("''"),
        }
    }
}

impl ScalarType {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax(&self.0);
    }
}

impl TableName {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.0);
    }
}

impl IndexName {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.0);
    }
}

impl TableAlias {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.name);
    }
}

impl ColumnName {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.0);
    }
}

impl ColumnReference {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            ColumnReference::TableColumn { table, name } => {
                table.to_sql(sql);
                sql.append_syntax(".");
                name.to_sql(sql);
            }
            ColumnReference::Unqualified(name) => name.to_sql(sql),
        }
    }
}

impl ColumnAlias {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.name);
    }
}
