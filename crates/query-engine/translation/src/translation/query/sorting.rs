//! Translate the sort of a request into an ORDER BY clause.

use indexmap::IndexMap;
use query_engine_metadata::metadata::Direction;
use query_engine_sql::sql;

use crate::translation::error::Error;
use crate::translation::helpers::TableNameAndInfo;

/// Sort by columns of the table in key order. Nulls sort as the smallest
/// value in either direction.
pub fn translate_order_by(
    table: &TableNameAndInfo,
    alias: &sql::ast::TableAlias,
    sort: &IndexMap<String, Direction>,
) -> Result<sql::ast::OrderBy, Error> {
    let elements = sort
        .iter()
        .map(|(field, direction)| {
            let column = table.lookup_column(field)?;
            let (direction, nulls) = match direction {
                Direction::Ascending => {
                    (sql::ast::OrderByDirection::Asc, sql::ast::NullsOrder::First)
                }
                Direction::Descending => {
                    (sql::ast::OrderByDirection::Desc, sql::ast::NullsOrder::Last)
                }
            };
            Ok(sql::ast::OrderByElement {
                target: sql::helpers::make_column(alias.clone(), field),
                direction,
                nulls: column.is_nullable().then_some(nulls),
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(sql::ast::OrderBy { elements })
}
