//! Translate a fragment query request.

pub mod computed;
pub mod context;
pub mod fields;
pub mod filtering;
pub mod permissions;
pub mod sorting;

use query_engine_metadata::metadata::User;
use query_engine_sql::sql;
use query_engine_sql::sql::string::Param;

use crate::translation::error::Error;
use crate::translation::helpers::{AliasGenerator, Env};
use crate::translation::request::FragmentQueryRequest;
use context::ProjectionContext;
use fields::FragmentResolver;
use filtering::SelectorTarget;

/// Translate a fragment query request to a single SQL statement and its
/// positional arguments.
///
/// Arguments are bound in this order: the current user's id, the values
/// needed by the fragment's fields (in field order), the selector, the limit
/// and the offset.
pub fn translate(
    env: &Env,
    request: &FragmentQueryRequest,
    current_user: Option<&User>,
    aliases: &mut dyn AliasGenerator,
) -> Result<sql::string::SQL, Error> {
    let (select, arguments) = translate_select(env, request, current_user, aliases)?;

    // log and return
    tracing::debug!("SQL AST: {:?}", select);
    let mut sql = sql::string::SQL::new();
    select.to_sql(&mut sql);
    sql.params = arguments.into_params();
    tracing::info!(
        fragment = %request.fragment,
        params = sql.params.len(),
        "Generated SQL: {}",
        sql.sql
    );
    Ok(sql)
}

/// Translate a fragment query request to a sql ast.
pub fn translate_select(
    env: &Env,
    request: &FragmentQueryRequest,
    current_user: Option<&User>,
    aliases: &mut dyn AliasGenerator,
) -> Result<(sql::ast::Select, sql::string::Arguments), Error> {
    let (fragment_name, fragment) = env.lookup_fragment(&request.fragment)?;
    let table = env.lookup_table(&fragment.table)?;

    let mut context = ProjectionContext::new(
        table,
        &env.settings.current_user_table,
        &request.resolver_args,
    );
    context.set_current_user(current_user)?;

    FragmentResolver::new(*env, current_user, aliases).resolve_fragment(
        &mut context,
        fragment_name,
        fragment,
    )?;

    let target = SelectorTarget {
        table,
        alias: Some(context.primary_prefix().clone()),
        case_insensitive: request
            .collation
            .as_ref()
            .is_some_and(|collation| collation.is_case_insensitive()),
    };
    let where_ = filtering::translate_selector(&target, context.arguments_mut(), &request.selector)?;
    let order_by = sorting::translate_order_by(&table, context.primary_prefix(), &request.sort)?;
    let limit = sql::ast::Limit {
        limit: request
            .limit
            .map(|limit| context.add_arg(Param::Integer(limit.into()))),
        offset: request
            .skip
            .map(|skip| context.add_arg(Param::Integer(skip.into()))),
    };

    let (mut select, arguments) =
        context.into_select(sql::ast::Where(where_), order_by, limit)?;
    select.comment = Some(sql::ast::Comment(format!("Fragment {fragment_name}")));
    Ok((select, arguments))
}
