//! Resolve the fields of a fragment into projections.
//! Because fragments nest through relations, resolving a relation field
//! recurses into the nested fragment with its own context.

use std::collections::BTreeSet;

use query_engine_metadata::metadata::{
    FieldKind, FieldSelection, FragmentInfo, RelationField, User, PRIMARY_KEY,
};

use super::computed::translate_computed_expression;
use super::context::ProjectionContext;
use super::permissions::can_read;
use crate::translation::error::Error;
use crate::translation::helpers::{AliasGenerator, Env};

/// The fragments currently being resolved, outermost first.
#[derive(Debug)]
pub struct FragmentPath<'a> {
    stack: Vec<&'a str>,
    max_depth: u32,
}

impl<'a> FragmentPath<'a> {
    pub fn new(max_depth: u32) -> Self {
        FragmentPath {
            stack: vec![],
            max_depth,
        }
    }

    /// Enter a fragment, failing if it is already being resolved or if the
    /// nesting gets too deep.
    pub fn enter(&mut self, fragment: &'a str) -> Result<(), Error> {
        if self.stack.contains(&fragment) {
            return Err(Error::FragmentCycle(fragment.to_string()));
        }
        // the outermost fragment is at depth 0
        if self.stack.len() > self.max_depth as usize {
            return Err(Error::MaxDepthExceeded(self.max_depth));
        }
        self.stack.push(fragment);
        Ok(())
    }

    pub fn leave(&mut self) {
        self.stack.pop();
    }
}

/// Everything that stays the same while resolving one query's fragments.
pub struct FragmentResolver<'a, 'b> {
    pub env: Env<'a>,
    pub user: Option<&'b User>,
    pub aliases: &'b mut dyn AliasGenerator,
    pub path: FragmentPath<'a>,
}

impl<'a, 'b> FragmentResolver<'a, 'b> {
    pub fn new(env: Env<'a>, user: Option<&'b User>, aliases: &'b mut dyn AliasGenerator) -> Self {
        FragmentResolver {
            env,
            user,
            aliases,
            path: FragmentPath::new(env.settings.max_fragment_depth),
        }
    }

    /// Resolve a named fragment into the projections of the context, which
    /// must be over the fragment's table.
    pub fn resolve_fragment(
        &mut self,
        context: &mut ProjectionContext<'a>,
        name: &'a str,
        fragment: &'a FragmentInfo,
    ) -> Result<(), Error> {
        self.path.enter(name)?;
        self.resolve_fields(context, name, fragment)?;
        self.path.leave();
        Ok(())
    }

    fn resolve_fields(
        &mut self,
        context: &mut ProjectionContext<'a>,
        fragment_name: &str,
        fragment: &'a FragmentInfo,
    ) -> Result<(), Error> {
        let table = context.table();
        let whole_row = self.add_base_row(context, false);

        let mut seen = BTreeSet::new();
        for selection in &fragment.fields {
            let name = selection.name();
            if !seen.insert(name) {
                return Err(Error::DuplicateField {
                    fragment: fragment_name.to_string(),
                    field: name.to_string(),
                });
            }

            let field = table.lookup_field(name)?;
            if !can_read(field, self.user) {
                tracing::debug!(
                    fragment = fragment_name,
                    table = table.name,
                    field = name,
                    "dropping a field the current user cannot read"
                );
                continue;
            }

            match (&field.kind, selection) {
                (FieldKind::Column(_), FieldSelection::Field(_)) => {
                    if !whole_row && name != PRIMARY_KEY {
                        context.add_projection(name, None);
                    }
                }
                (FieldKind::Computed(computed), FieldSelection::Field(_)) => {
                    let expression =
                        translate_computed_expression(context, &computed.expression, self.aliases)?;
                    context.add_projection(name, Some(expression));
                }
                (FieldKind::Relation(relation), _) => {
                    self.resolve_relation(context, name, relation, selection)?;
                }
                (FieldKind::Column(_) | FieldKind::Computed(_), FieldSelection::Nested { .. }) => {
                    return Err(Error::UnexpectedSubFragment {
                        table: table.name.to_string(),
                        field: name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Project the base row: the whole row when every column is readable,
    /// otherwise just `_id` (or every readable column when `all_readable`
    /// is set). Returns whether the whole row was projected.
    fn add_base_row(&self, context: &mut ProjectionContext<'a>, all_readable: bool) -> bool {
        let table = context.table();
        if table.info.columns().all(|(_, field, _)| can_read(field, self.user)) {
            context.add_row_projection();
            return true;
        }

        context.add_projection(PRIMARY_KEY, None);
        if all_readable {
            for (name, field, _) in table.info.columns() {
                if name != PRIMARY_KEY && can_read(field, self.user) {
                    context.add_projection(name, None);
                }
            }
        }
        false
    }

    fn resolve_relation(
        &mut self,
        context: &mut ProjectionContext<'a>,
        name: &str,
        relation: &'a RelationField,
        selection: &'a FieldSelection,
    ) -> Result<(), Error> {
        let alias = context.add_join(&relation.join, self.aliases)?;
        let table = self.env.lookup_table(&relation.join.table)?;
        let mut nested = context.nested(table, alias);

        match selection {
            FieldSelection::Field(_) => {
                self.add_base_row(&mut nested, true);
            }
            FieldSelection::Nested { fragment, .. } => {
                let (fragment_name, fragment) = self.env.lookup_fragment(fragment)?;
                if fragment.table != relation.join.table {
                    return Err(Error::FragmentTableMismatch {
                        fragment: fragment_name.to_string(),
                        fragment_table: fragment.table.clone(),
                        field: name.to_string(),
                        table: relation.join.table.clone(),
                    });
                }
                self.resolve_fragment(&mut nested, fragment_name, fragment)?;
            }
        }

        context.aggregate(nested, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fragment_sql_configuration::CompilerSettings;
    use indexmap::IndexMap;
    use query_engine_metadata::metadata::Metadata;

    use crate::translation::helpers::SequentialAliasGenerator;

    fn metadata() -> Metadata {
        serde_json::from_value(serde_json::json!({
            "tables": {
                "Posts": {
                    "fields": {
                        "_id": { "kind": "column", "type": { "scalar_type": "text" }, "nullable": "NonNullable" },
                        "title": { "kind": "column", "type": { "scalar_type": "text" } },
                        "userId": { "kind": "column", "type": { "scalar_type": "text" } },
                        "user": {
                            "kind": "relation",
                            "join": { "table": "Users", "on": { "_id": { "column": "userId" } } }
                        }
                    }
                },
                "Users": {
                    "fields": {
                        "_id": { "kind": "column", "type": { "scalar_type": "text" }, "nullable": "NonNullable" },
                        "displayName": { "kind": "column", "type": { "scalar_type": "text" } }
                    }
                }
            },
            "fragments": {
                "UsersMinimumInfo": { "table": "Users", "fields": ["_id", "displayName"] },
                "PostsWithUser": {
                    "table": "Posts",
                    "fields": ["title", { "name": "user", "fragment": "UsersMinimumInfo" }]
                },
                "PostsRepeatingTitle": { "table": "Posts", "fields": ["_id", "title", "title"] },
                "PostsWithNestedTitle": {
                    "table": "Posts",
                    "fields": [{ "name": "title", "fragment": "UsersMinimumInfo" }]
                }
            }
        }))
        .unwrap()
    }

    /// Resolve a fragment of `metadata()` without a current user, returning
    /// the number of projections and joins of the outermost context.
    fn resolve(fragment: &str) -> Result<(usize, usize), Error> {
        let metadata = metadata();
        let settings = CompilerSettings::default();
        let args = IndexMap::new();
        let env = Env::new(&metadata, &settings);
        let (name, info) = env.lookup_fragment(fragment)?;
        let mut context = ProjectionContext::new(env.lookup_table(&info.table)?, "Users", &args);
        let mut aliases = SequentialAliasGenerator::new();
        let mut resolver = FragmentResolver::new(env, None, &mut aliases);
        resolver.resolve_fragment(&mut context, name, info)?;
        Ok((context.projections().len(), context.joins().count()))
    }

    #[test]
    fn test_nested_fragments_are_resolved() {
        // the whole row covers `title`, so only `user` is projected
        assert_eq!(resolve("PostsWithUser"), Ok((1, 1)));
    }

    #[test]
    fn test_fields_are_listed_once() {
        assert_eq!(
            resolve("PostsRepeatingTitle"),
            Err(Error::DuplicateField {
                fragment: "PostsRepeatingTitle".to_string(),
                field: "title".to_string(),
            })
        );
    }

    #[test]
    fn test_only_relations_take_a_sub_fragment() {
        assert_eq!(
            resolve("PostsWithNestedTitle"),
            Err(Error::UnexpectedSubFragment {
                table: "Posts".to_string(),
                field: "title".to_string(),
            })
        );
    }

    #[test]
    fn test_fragment_path_rejects_cycles() {
        let mut path = FragmentPath::new(10);
        path.enter("PostsList").unwrap();
        path.enter("UsersMinimumInfo").unwrap();
        assert_eq!(
            path.enter("PostsList"),
            Err(Error::FragmentCycle("PostsList".to_string()))
        );
        path.leave();
        assert_eq!(path.enter("UsersMinimumInfo"), Ok(()));
    }

    #[test]
    fn test_fragment_path_is_bounded() {
        let names = ["A", "B", "C", "D"];
        let mut path = FragmentPath::new(2);
        path.enter(names[0]).unwrap();
        path.enter(names[1]).unwrap();
        path.enter(names[2]).unwrap();
        assert_eq!(path.enter(names[3]), Err(Error::MaxDepthExceeded(2)));
    }
}
