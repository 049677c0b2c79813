//! Type definitions of a SQL AST representation.

use super::string::Placeholder;

/// A SELECT clause
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub comment: Option<Comment>,
    pub select_list: SelectList,
    pub from: Option<From>,
    pub joins: Vec<Join>,
    pub where_: Where,
    pub order_by: OrderBy,
    pub limit: Limit,
}

/// A `-- comment` line preceding a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment(pub String);

/// A select list
#[derive(Debug, Clone, PartialEq)]
pub struct SelectList(pub Vec<SelectItem>);

/// A single item of a select list
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `"t".*`
    Star(TableAlias),
    /// `"t"."column"`, which is named after the column itself
    Column(ColumnReference),
    /// `<expression> "alias"`
    Expression {
        expression: Expression,
        alias: ColumnAlias,
    },
}

/// A FROM clause
#[derive(Debug, Clone, PartialEq)]
pub enum From {
    /// Select from a table
    Table {
        reference: TableName,
        alias: TableAlias,
    },
}

/// A JOIN clause
#[derive(Debug, Clone, PartialEq)]
pub enum Join {
    /// LEFT JOIN
    LeftOuterJoin(TableJoin),
    /// INNER JOIN
    InnerJoin(TableJoin),
}

impl Join {
    /// Get the joined table regardless of the join type.
    pub fn table_join(&self) -> &TableJoin {
        match self {
            Join::LeftOuterJoin(join) | Join::InnerJoin(join) => join,
        }
    }
}

/// A table joined to the query, with its conjunctive ON conditions
#[derive(Debug, Clone, PartialEq)]
pub struct TableJoin {
    pub table: TableName,
    pub alias: TableAlias,
    pub on: Vec<Expression>,
}

/// A WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub struct Where(pub Expression);

/// An ORDER BY clause
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub elements: Vec<OrderByElement>,
}

/// A single element in an ORDER BY clause
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByElement {
    pub target: Expression,
    pub direction: OrderByDirection,
    pub nulls: Option<NullsOrder>,
}

/// A direction for a single ORDER BY element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderByDirection {
    Asc,
    Desc,
}

/// NULLS FIRST | NULLS LAST
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

/// LIMIT and OFFSET clauses. Both are always bound as arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limit {
    pub limit: Option<Placeholder>,
    pub offset: Option<Placeholder>,
}

/// A CREATE INDEX statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndex {
    pub name: IndexName,
    pub table: TableName,
    pub unique: bool,
    pub concurrently: bool,
    pub if_not_exists: bool,
    pub method: IndexMethod,
    pub elements: Vec<Expression>,
    pub where_: Where,
}

/// A DROP INDEX statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropIndex {
    pub name: IndexName,
    pub if_exists: bool,
}

/// The access method of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMethod {
    Btree,
    Gin,
}

/// A scalar expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// AND clause over any number of operands
    And(Vec<Expression>),
    /// OR clause over any number of operands
    Or(Vec<Expression>),
    /// NOT clause
    Not(Box<Expression>),
    /// A binary operation on two scalar expression
    BinaryOperation {
        left: Box<Expression>,
        operator: BinaryOperator,
        right: Box<Expression>,
    },
    /// A binary operation on a scalar expression and an array of scalar expressions
    BinaryArrayOperation {
        left: Box<Expression>,
        operator: BinaryArrayOperator,
        right: Vec<Expression>,
    },
    /// An unary operation on a scalar expression
    UnaryOperation {
        expression: Box<Expression>,
        operator: UnaryOperator,
    },
    /// A scalar function call
    FunctionCall {
        function: Function,
        args: Vec<Expression>,
    },
    /// `ARRAY[ a , b ]`
    ArrayConstructor(Vec<Expression>),
    /// A column reference
    ColumnReference(ColumnReference),
    /// Extraction of a JSON sub-path, e.g. `("c"->'d'->>'e')`
    JsonPath {
        expression: Box<Expression>,
        path: Vec<JsonPathElement>,
        /// extract the last step as text (`->>`)
        as_text: bool,
    },
    /// `CASE WHEN .. THEN .. ELSE .. END`
    Case {
        when: Box<Expression>,
        then: Box<Expression>,
        else_: Box<Expression>,
    },
    /// A row as a JSON object, with extra fields concatenated on:
    /// `(TO_JSONB("q".*) || JSONB_BUILD_OBJECT( 'k', v ))`
    JsonbObject {
        row: Option<TableAlias>,
        fields: Vec<JsonbField>,
    },
    Cast {
        expression: Box<Expression>,
        r#type: ScalarType,
    },
    /// A constant chosen by the compiler
    Value(Value),
    /// A bound argument
    Placeholder(Placeholder),
}

/// A `'key', value` pair of a `JSONB_BUILD_OBJECT` call
#[derive(Debug, Clone, PartialEq)]
pub struct JsonbField {
    pub key: ColumnAlias,
    pub value: Expression,
}

/// A single step of a JSON path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonPathElement {
    Key(String),
    Index(u32),
}

/// An unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    IsNull,
    IsNotNull,
    IsTrue,
    IsNotTrue,
    IsFalse,
    IsNotFalse,
}

/// A binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Equals,
    NotEquals,
    IsDistinctFrom,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    /// `@>`
    Contains,
    /// `&&`
    Overlaps,
    Plus,
    Minus,
    Multiply,
    Divide,
}

/// A binary operator when the rhs is an array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryArrayOperator {
    In,
}

/// A scalar function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Function {
    Coalesce,
    Lower,
    ArrayLength,
    /// A function named by the schema registry
    Unknown(String),
}

/// Constants the compiler itself emits.
///
/// There is deliberately no string variant: caller-supplied values are only
/// ever rendered as placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Int4(i32),
    /// `''`
    EmptyString,
}

/// Scalar type name, as used in a cast. Always output unquoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarType(pub String);

/// A database table name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(pub String);

/// A database index name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexName(pub String);

/// A database table's column name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnName(pub String);

/// A reference to a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnReference {
    /// a column of an aliased table: `"t"."name"`
    TableColumn { table: TableAlias, name: ColumnName },
    /// a bare column, as used in index definitions: `"name"`
    Unqualified(ColumnName),
}

/// aliases that we give to relations
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableAlias {
    pub name: String,
}

/// aliases that we give to columns
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnAlias {
    pub name: String,
}
