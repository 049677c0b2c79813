//! The state of one query compilation: aliases, joins, arguments and the
//! projected fields of a table.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use indexmap::IndexMap;
use query_engine_metadata::metadata::{JoinOperand, JoinSpec, JoinType, User, PRIMARY_KEY};
use query_engine_sql::sql;
use query_engine_sql::sql::string::{Arguments, Param, Placeholder};

use crate::translation::error::Error;
use crate::translation::helpers::{AliasGenerator, TableNameAndInfo};

/// The alias of the current user's row.
pub const CURRENT_USER_ALIAS: &str = "currentUser";

/// A compiled output field. Fields of the outermost query are select list
/// items; fields of a nested context become pairs of a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Select(sql::ast::SelectItem),
    Jsonb(sql::ast::JsonbField),
}

/// A join together with the context that asked for it.
#[derive(Debug, Clone, PartialEq)]
struct RegisteredJoin {
    owner: sql::ast::TableAlias,
    /// `None` for the current user join, which is not described by the metadata.
    spec: Option<JoinSpec>,
    join: sql::ast::Join,
}

/// Per-compilation state of a query over one table.
///
/// The outermost context selects rows of its table; a nested context builds
/// the JSON object of a related row, which [`ProjectionContext::aggregate`]
/// folds back into its parent.
#[derive(Debug)]
pub struct ProjectionContext<'a> {
    table: TableNameAndInfo<'a>,
    prefix: sql::ast::TableAlias,
    is_aggregate: bool,
    row: bool,
    arguments: Arguments,
    projections: Vec<Projection>,
    joins: Vec<RegisteredJoin>,
    current_user_joined: bool,
    current_user_table: &'a str,
    resolver_args: &'a IndexMap<String, serde_json::Value>,
    bound_resolver_args: BTreeMap<String, Placeholder>,
}

impl<'a> ProjectionContext<'a> {
    /// The context of the outermost query. Its table is aliased by the
    /// lowercase first letter of the table name.
    pub fn new(
        table: TableNameAndInfo<'a>,
        current_user_table: &'a str,
        resolver_args: &'a IndexMap<String, serde_json::Value>,
    ) -> ProjectionContext<'a> {
        let prefix = table
            .name
            .chars()
            .next()
            .map_or_else(|| "t".to_string(), |c| c.to_lowercase().collect());
        ProjectionContext {
            table,
            prefix: sql::helpers::make_table_alias(prefix),
            is_aggregate: false,
            row: false,
            arguments: Arguments::new(),
            projections: vec![],
            joins: vec![],
            current_user_joined: false,
            current_user_table,
            resolver_args,
            bound_resolver_args: BTreeMap::new(),
        }
    }

    /// A context for a related row, reached through a join aliased `alias`.
    /// Its arguments continue the numbering of this context.
    pub fn nested(
        &self,
        table: TableNameAndInfo<'a>,
        alias: sql::ast::TableAlias,
    ) -> ProjectionContext<'a> {
        ProjectionContext {
            table,
            prefix: alias,
            is_aggregate: true,
            row: false,
            arguments: self.arguments.nested(),
            projections: vec![],
            joins: vec![],
            current_user_joined: self.current_user_joined,
            current_user_table: self.current_user_table,
            resolver_args: self.resolver_args,
            bound_resolver_args: self.bound_resolver_args.clone(),
        }
    }

    pub fn table(&self) -> TableNameAndInfo<'a> {
        self.table
    }

    pub fn primary_prefix(&self) -> &sql::ast::TableAlias {
        &self.prefix
    }

    pub fn is_aggregate(&self) -> bool {
        self.is_aggregate
    }

    /// Project a column of this context's table under its own name:
    /// `"t"."name"`, or `'name', "q"."name"` in a nested context.
    pub fn field(&self, name: &str) -> Projection {
        if self.is_aggregate {
            Projection::Jsonb(sql::ast::JsonbField {
                key: sql::helpers::make_column_alias(name.to_string()),
                value: self.absolute_field(name),
            })
        } else {
            Projection::Select(sql::ast::SelectItem::Column(
                sql::ast::ColumnReference::TableColumn {
                    table: self.prefix.clone(),
                    name: sql::ast::ColumnName(name.to_string()),
                },
            ))
        }
    }

    /// Project an expression under a name.
    pub fn named_expression(&self, name: &str, expression: sql::ast::Expression) -> Projection {
        let alias = sql::helpers::make_column_alias(name.to_string());
        if self.is_aggregate {
            Projection::Jsonb(sql::ast::JsonbField {
                key: alias,
                value: expression,
            })
        } else {
            Projection::Select(sql::ast::SelectItem::Expression { expression, alias })
        }
    }

    /// A column of this context's table: `"t"."name"`.
    pub fn absolute_field(&self, name: &str) -> sql::ast::Expression {
        sql::helpers::make_column(self.prefix.clone(), name)
    }

    /// A column of the current user: `"currentUser"."name"`.
    pub fn current_user_field(&self, name: &str) -> Result<sql::ast::Expression, Error> {
        if !self.current_user_joined {
            return Err(Error::CurrentUserNotSet);
        }
        Ok(sql::helpers::make_column(
            sql::helpers::make_table_alias(CURRENT_USER_ALIAS.to_string()),
            name,
        ))
    }

    /// Join the current user's row, bound by id. A logged-out user binds
    /// `NULL`, so the join is present either way and simply matches nothing.
    pub fn set_current_user(&mut self, user: Option<&User>) -> Result<(), Error> {
        if self.is_aggregate {
            return Err(Error::CurrentUserInNestedContext);
        }
        if self.current_user_joined {
            return Err(Error::CurrentUserAlreadySet);
        }

        let id = user.map_or(Param::Null, |user| Param::String(user.id.clone()));
        let placeholder = self.arguments.bind(id);
        let alias = sql::helpers::make_table_alias(CURRENT_USER_ALIAS.to_string());
        self.joins.push(RegisteredJoin {
            owner: self.prefix.clone(),
            spec: None,
            join: sql::ast::Join::LeftOuterJoin(sql::ast::TableJoin {
                table: sql::ast::TableName(self.current_user_table.to_string()),
                alias: alias.clone(),
                on: vec![sql::helpers::binary(
                    sql::helpers::make_column(alias, PRIMARY_KEY),
                    sql::ast::BinaryOperator::Equals,
                    sql::ast::Expression::Placeholder(placeholder),
                )],
            }),
        });
        self.current_user_joined = true;
        Ok(())
    }

    /// Register a join and return the alias of the joined table. A join this
    /// context already registered is reused rather than repeated.
    pub fn add_join(
        &mut self,
        spec: &JoinSpec,
        aliases: &mut dyn AliasGenerator,
    ) -> Result<sql::ast::TableAlias, Error> {
        if let Some(existing) = self
            .joins
            .iter()
            .find(|join| join.owner == self.prefix && join.spec.as_ref() == Some(spec))
        {
            return Ok(existing.join.table_join().alias.clone());
        }

        let alias = sql::helpers::make_table_alias(aliases.next_alias());
        let mut on = Vec::with_capacity(spec.on.len());
        for (remote_column, operand) in &spec.on {
            let value = self.join_operand(operand)?;
            on.push(sql::helpers::binary(
                sql::helpers::make_column(alias.clone(), remote_column),
                sql::ast::BinaryOperator::Equals,
                value,
            ));
        }

        let table_join = sql::ast::TableJoin {
            table: sql::ast::TableName(spec.table.clone()),
            alias: alias.clone(),
            on,
        };
        self.joins.push(RegisteredJoin {
            owner: self.prefix.clone(),
            spec: Some(spec.clone()),
            join: match spec.join_type {
                JoinType::Left => sql::ast::Join::LeftOuterJoin(table_join),
                JoinType::Inner => sql::ast::Join::InnerJoin(table_join),
            },
        });
        Ok(alias)
    }

    fn join_operand(&mut self, operand: &JoinOperand) -> Result<sql::ast::Expression, Error> {
        match operand {
            JoinOperand::Column(column) => {
                self.table.lookup_column(column)?;
                Ok(self.absolute_field(column))
            }
            JoinOperand::CurrentUserColumn(column) => self.current_user_field(column),
            JoinOperand::ResolverArg(name) => Ok(self.resolver_arg(name)),
            JoinOperand::Value(value) => Ok(sql::ast::Expression::Placeholder(
                self.add_arg(Param::from(value)),
            )),
        }
    }

    /// Bind a value and return its placeholder.
    pub fn add_arg(&mut self, param: Param) -> Placeholder {
        self.arguments.bind(param)
    }

    /// The value of a resolver argument. It is bound the first time it is
    /// used and its placeholder reused after that; an argument the request
    /// did not supply is `NULL`.
    pub fn resolver_arg(&mut self, name: &str) -> sql::ast::Expression {
        if let Some(placeholder) = self.bound_resolver_args.get(name) {
            return sql::ast::Expression::Placeholder(*placeholder);
        }
        match self.resolver_args.get(name) {
            None => sql::ast::Expression::Value(sql::ast::Value::Null),
            Some(value) => {
                let placeholder = self.arguments.bind(Param::from(value));
                self.bound_resolver_args
                    .insert(name.to_string(), placeholder);
                sql::ast::Expression::Placeholder(placeholder)
            }
        }
    }

    /// Project the whole row of this context's table.
    pub fn add_row_projection(&mut self) {
        self.row = true;
    }

    /// Project a column under its own name, or an expression under `name`.
    pub fn add_projection(&mut self, name: &str, expression: Option<sql::ast::Expression>) {
        let projection = match expression {
            None => self.field(name),
            Some(expression) => self.named_expression(name, expression),
        };
        self.projections.push(projection);
    }

    /// Fold a nested context into this one as the projection `name`: the
    /// related row as a JSON object, or `NULL` when there is no related row.
    pub fn aggregate(&mut self, child: ProjectionContext<'a>, name: &str) -> Result<(), Error> {
        let ProjectionContext {
            prefix,
            row,
            arguments,
            projections,
            joins,
            bound_resolver_args,
            ..
        } = child;

        let fields = projections
            .into_iter()
            .filter_map(|projection| match projection {
                Projection::Jsonb(field) => Some(field),
                Projection::Select(_) => None,
            })
            .collect();
        let expression = sql::helpers::nullable_related_row(
            prefix.clone(),
            PRIMARY_KEY,
            row.then_some(prefix),
            fields,
        );
        self.add_projection(name, Some(expression));

        for join in joins {
            if !self.joins.contains(&join) {
                self.joins.push(join);
            }
        }
        self.arguments.absorb(arguments)?;
        self.bound_resolver_args.extend(bound_resolver_args);
        Ok(())
    }

    /// The values bound so far by this context.
    pub fn args(&self) -> &[Param] {
        self.arguments.params()
    }

    pub fn arguments_mut(&mut self) -> &mut Arguments {
        &mut self.arguments
    }

    /// The joins registered so far, in order.
    pub fn joins(&self) -> impl Iterator<Item = &sql::ast::Join> {
        self.joins.iter().map(|join| &join.join)
    }

    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    /// Build the select of the outermost query, together with its arguments.
    pub fn into_select(
        self,
        where_: sql::ast::Where,
        order_by: sql::ast::OrderBy,
        limit: sql::ast::Limit,
    ) -> Result<(sql::ast::Select, Arguments), Error> {
        let mut select_list = vec![];
        if self.row {
            select_list.push(sql::ast::SelectItem::Star(self.prefix.clone()));
        }
        select_list.extend(
            self.projections
                .into_iter()
                .filter_map(|projection| match projection {
                    Projection::Select(item) => Some(item),
                    Projection::Jsonb(_) => None,
                }),
        );

        let mut aliases = BTreeSet::from([self.prefix.name.clone()]);
        for join in &self.joins {
            let alias = &join.join.table_join().alias.name;
            if !aliases.insert(alias.clone()) {
                return Err(Error::DuplicateTableAlias(alias.clone()));
            }
        }

        let mut select = sql::helpers::simple_select(
            sql::ast::TableName(self.table.name.to_string()),
            self.prefix,
            select_list,
        );
        select.joins = self.joins.into_iter().map(|join| join.join).collect();
        select.where_ = where_;
        select.order_by = order_by;
        select.limit = limit;
        Ok((select, self.arguments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_engine_metadata::metadata::TableInfo;
    use query_engine_sql::sql::string::SQL;

    fn table_info() -> TableInfo {
        serde_json::from_value(serde_json::json!({
            "fields": {
                "_id": { "kind": "column", "type": { "scalar_type": "text" }, "nullable": "NonNullable" },
                "userId": { "kind": "column", "type": { "scalar_type": "text" } }
            }
        }))
        .unwrap()
    }

    fn users_join() -> JoinSpec {
        JoinSpec {
            table: "Users".to_string(),
            join_type: JoinType::Left,
            on: IndexMap::from([(
                "_id".to_string(),
                JoinOperand::Column("userId".to_string()),
            )]),
        }
    }

    fn render(join: &sql::ast::Join) -> String {
        let mut sql = SQL::new();
        join.to_sql(&mut sql);
        sql.sql
    }

    #[test]
    fn test_logged_out_user_binds_null() {
        let info = table_info();
        let args = IndexMap::new();
        let table = TableNameAndInfo {
            name: "TestCollection",
            info: &info,
        };
        let mut context = ProjectionContext::new(table, "Users", &args);
        context.set_current_user(None).unwrap();

        assert_eq!(context.args(), &[Param::Null]);
        let joins = context.joins().collect::<Vec<_>>();
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].table_join().table.0, "Users");
        assert_eq!(
            render(joins[0]),
            r#"LEFT JOIN "Users" "currentUser" ON "currentUser"."_id" = $1"#
        );
    }

    #[test]
    fn test_current_user_is_set_once_on_the_outermost_context() {
        let info = table_info();
        let args = IndexMap::new();
        let table = TableNameAndInfo {
            name: "TestCollection",
            info: &info,
        };
        let mut context = ProjectionContext::new(table, "Users", &args);
        assert_eq!(
            context.current_user_field("_id"),
            Err(Error::CurrentUserNotSet)
        );
        context.set_current_user(None).unwrap();
        assert_eq!(
            context.set_current_user(None),
            Err(Error::CurrentUserAlreadySet)
        );

        let mut nested = context.nested(table, sql::helpers::make_table_alias("q".to_string()));
        assert_eq!(
            nested.set_current_user(None),
            Err(Error::CurrentUserInNestedContext)
        );
        assert!(nested.current_user_field("_id").is_ok());
    }

    #[test]
    fn test_fields_are_prefixed_or_paired() {
        let info = table_info();
        let args = IndexMap::new();
        let table = TableNameAndInfo {
            name: "TestCollection",
            info: &info,
        };
        let context = ProjectionContext::new(table, "Users", &args);
        assert_eq!(context.primary_prefix().name, "t");
        let nested = context.nested(table, sql::helpers::make_table_alias("p".to_string()));

        let mut sql = SQL::new();
        match context.field("title") {
            Projection::Select(item) => item.to_sql(&mut sql),
            Projection::Jsonb(_) => panic!("expected a select item"),
        }
        sql.append_syntax(" / ");
        match nested.field("title") {
            Projection::Jsonb(field) => field.to_sql(&mut sql),
            Projection::Select(_) => panic!("expected a JSON field"),
        }
        assert_eq!(sql.sql, r#""t"."title" / 'title', "p"."title""#);
    }

    #[test]
    fn test_equal_joins_are_registered_once() {
        let info = table_info();
        let args = IndexMap::new();
        let table = TableNameAndInfo {
            name: "TestCollection",
            info: &info,
        };
        let mut context = ProjectionContext::new(table, "Users", &args);
        let mut aliases = crate::translation::helpers::SequentialAliasGenerator::new();

        let first = context.add_join(&users_join(), &mut aliases).unwrap();
        let second = context.add_join(&users_join(), &mut aliases).unwrap();
        assert_eq!(first, second);
        assert_eq!(context.joins().count(), 1);
        assert_eq!(
            render(context.joins().next().unwrap()),
            r#"LEFT JOIN "Users" "j1" ON "j1"."_id" = "t"."userId""#
        );
    }

    #[test]
    fn test_resolver_args_are_bound_once_and_shared_with_nested_contexts() {
        let info = table_info();
        let args = IndexMap::from([("tagId".to_string(), serde_json::json!("tag"))]);
        let table = TableNameAndInfo {
            name: "TestCollection",
            info: &info,
        };
        let mut context = ProjectionContext::new(table, "Users", &args);
        context.set_current_user(None).unwrap();

        let bound = context.resolver_arg("tagId");
        assert_eq!(context.resolver_arg("tagId"), bound);
        assert_eq!(
            context.resolver_arg("missing"),
            sql::ast::Expression::Value(sql::ast::Value::Null)
        );

        let mut nested = context.nested(table, sql::helpers::make_table_alias("q".to_string()));
        assert_eq!(nested.resolver_arg("tagId"), bound);
        nested.add_row_projection();
        context.aggregate(nested, "related").unwrap();
        assert_eq!(
            context.args(),
            &[Param::Null, Param::String("tag".to_string())]
        );
    }

    #[test]
    fn test_duplicate_aliases_are_rejected() {
        let info = table_info();
        let args = IndexMap::new();
        let table = TableNameAndInfo {
            name: "TestCollection",
            info: &info,
        };
        let mut context = ProjectionContext::new(table, "Users", &args);
        let mut aliases = || "t".to_string();
        context.add_join(&users_join(), &mut aliases).unwrap();
        assert_eq!(
            context
                .into_select(
                    sql::ast::Where(sql::helpers::empty_where()),
                    sql::helpers::empty_order_by(),
                    sql::helpers::empty_limit(),
                )
                .map(|_| ()),
            Err(Error::DuplicateTableAlias("t".to_string()))
        );
    }
}
