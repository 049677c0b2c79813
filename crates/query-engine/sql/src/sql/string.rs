//! Type definitions of a low-level SQL string representation.

use thiserror::Error;

/// A low-level representation of a SQL string and its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SQL {
    pub sql: String,
    pub params: Vec<Param>,
}

/// A DDL statement, to be handed to a migration runner rather than executed as a query.
#[derive(Debug, Clone, PartialEq)]
pub struct DDL(pub SQL);

/// A value bound to a `$n` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    /// An integer too large for `i64`, sent as its exact decimal text.
    Numeric(String),
    String(String),
    /// Arrays and objects are passed through as JSON.
    Json(serde_json::Value),
}

impl From<&serde_json::Value> for Param {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Param::Null,
            serde_json::Value::Bool(b) => Param::Bool(*b),
            serde_json::Value::Number(num) => match num.as_i64() {
                Some(i) => Param::Integer(i),
                None if num.is_u64() => Param::Numeric(num.to_string()),
                None => num.as_f64().map_or(Param::Null, Param::Float),
            },
            serde_json::Value::String(s) => Param::String(s.clone()),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                Param::Json(value.clone())
            }
        }
    }
}

/// A positional placeholder (`$n`).
///
/// Placeholders cannot be built directly: the only way to get one is to bind
/// a value with [`Arguments::bind`], which keeps values out of the SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Placeholder(usize);

impl Placeholder {
    /// The 1-based index of this placeholder.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Nested arguments were absorbed into a parent they did not continue from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("argument offset mismatch: expected nested arguments to start after {expected}, but they start after {found}")]
pub struct ArgumentOffsetMismatch {
    pub expected: usize,
    pub found: usize,
}

/// The positional argument list of one statement.
///
/// Arguments are append-only. Nested argument lists continue the numbering of
/// their parent and are folded back into it with [`Arguments::absorb`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arguments {
    offset: usize,
    params: Vec<Param>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty argument list whose first placeholder will be `$offset+1`.
    pub fn with_offset(offset: usize) -> Self {
        Arguments {
            offset,
            params: vec![],
        }
    }

    /// An empty argument list continuing the numbering of this one.
    pub fn nested(&self) -> Self {
        Self::with_offset(self.len())
    }

    /// Append a value and return its placeholder.
    pub fn bind(&mut self, param: Param) -> Placeholder {
        self.params.push(param);
        Placeholder(self.offset + self.params.len())
    }

    /// Append the arguments of a nested list created with [`Arguments::nested`].
    pub fn absorb(&mut self, nested: Arguments) -> Result<(), ArgumentOffsetMismatch> {
        if nested.offset != self.len() {
            return Err(ArgumentOffsetMismatch {
                expected: self.len(),
                found: nested.offset,
            });
        }
        self.params.extend(nested.params);
        Ok(())
    }

    /// The offset plus the number of bound values, i.e. the index of the last placeholder.
    pub fn len(&self) -> usize {
        self.offset + self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn into_params(self) -> Vec<Param> {
        self.params
    }
}

impl Default for SQL {
    fn default() -> Self {
        Self::new()
    }
}

impl SQL {
    /// Create an empty SQL string.
    pub fn new() -> SQL {
        SQL {
            sql: String::new(),
            params: vec![],
        }
    }

    /// Append raw syntax (keywords, punctuation) chosen by the compiler.
    pub fn append_syntax(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Append a double-quoted identifier.
    pub fn append_identifier(&mut self, sql: &str) {
        self.sql.push('"');
        self.sql.push_str(&sql.replace('"', "\"\""));
        self.sql.push('"');
    }

    /// Append a single-quoted string literal. Only used for schema-controlled
    /// names such as JSON object keys and JSON path segments.
    pub fn append_string_literal(&mut self, sql: &str) {
        self.sql.push('\'');
        self.sql.push_str(&sql.replace('\'', "''"));
        self.sql.push('\'');
    }

    /// Append a placeholder.
    pub fn append_placeholder(&mut self, placeholder: Placeholder) {
        self.sql.push('$');
        self.sql.push_str(&placeholder.index().to_string());
    }

    /// Append a `-- comment` line. Newlines in the comment are replaced so
    /// the comment cannot swallow the statement.
    pub fn append_comment(&mut self, comment: &str) {
        self.sql.push_str("-- ");
        self.sql.push_str(&comment.replace(['\n', '\r'], "_"));
        self.sql.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_arguments_continue_numbering() {
        let mut args = Arguments::new();
        assert_eq!(args.bind(Param::Null).index(), 1);
        let mut nested = args.nested();
        assert_eq!(nested.bind(Param::Integer(3)).index(), 2);
        assert_eq!(nested.bind(Param::Bool(true)).index(), 3);
        args.absorb(nested).unwrap();
        assert_eq!(args.bind(Param::String("x".into())).index(), 4);
        assert_eq!(
            args.into_params(),
            vec![
                Param::Null,
                Param::Integer(3),
                Param::Bool(true),
                Param::String("x".into())
            ]
        );
    }

    #[test]
    fn stale_nested_arguments_are_rejected() {
        let mut args = Arguments::new();
        let nested = args.nested();
        args.bind(Param::Null);
        assert_eq!(
            args.absorb(nested),
            Err(ArgumentOffsetMismatch {
                expected: 1,
                found: 0
            })
        );
    }

    #[test]
    fn identifiers_and_literals_are_escaped() {
        let mut sql = SQL::new();
        sql.append_identifier("we\"ird");
        sql.append_syntax(" ");
        sql.append_string_literal("it's");
        sql.append_syntax("\n");
        sql.append_comment("a\nb");
        assert_eq!(sql.sql, "\"we\"\"ird\" 'it''s'\n-- a_b\n");
    }

    #[test]
    fn json_values_become_typed_params() {
        assert_eq!(Param::from(&serde_json::json!(3)), Param::Integer(3));
        assert_eq!(Param::from(&serde_json::json!(1.5)), Param::Float(1.5));
        assert_eq!(
            Param::from(&serde_json::json!("test")),
            Param::String("test".into())
        );
        assert_eq!(
            Param::from(&serde_json::json!([1, 2])),
            Param::Json(serde_json::json!([1, 2]))
        );
        assert_eq!(
            Param::from(&serde_json::json!(u64::MAX)),
            Param::Numeric("18446744073709551615".into())
        );
        assert_eq!(
            Param::from(&serde_json::json!(i64::MIN)),
            Param::Integer(i64::MIN)
        );
    }
}
