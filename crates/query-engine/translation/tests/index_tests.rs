mod common;

use indexmap::IndexMap;
use similar_asserts::assert_eq;

use query_engine_metadata::metadata::{Collation, Direction, IndexOptions};
use query_engine_sql::sql::string::Param;
use query_engine_translation::translation::ddl::{
    translate_create_index, translate_drop_index, translate_table_indexes, TableIndex,
};
use query_engine_translation::translation::error::Error;

fn fields(names: &[&str]) -> IndexMap<String, Direction> {
    names
        .iter()
        .map(|name| (name.to_string(), Direction::Ascending))
        .collect()
}

async fn create_index(index: &TableIndex) -> Result<(String, Vec<Param>), Error> {
    let configuration = common::configuration().await.unwrap();
    translate_create_index(&configuration.metadata, index).map(|ddl| (ddl.0.sql, ddl.0.params))
}

#[tokio::test]
async fn btree_index() {
    let index = TableIndex::new("TestCollection", fields(&["a", "b"]));
    assert_eq!(
        create_index(&index).await.unwrap(),
        (
            r#"CREATE INDEX IF NOT EXISTS "idx_TestCollection_a_b" ON "TestCollection" USING btree ( "a" , "b" )"#.to_string(),
            vec![]
        )
    );
}

#[tokio::test]
async fn json_path_makes_a_gin_index() {
    let index = TableIndex::new("TestCollection", fields(&["a", "c.d"]));
    assert_eq!(
        create_index(&index).await.unwrap().0,
        r#"CREATE INDEX IF NOT EXISTS "idx_TestCollection_a_c__d" ON "TestCollection" USING gin ( "a" , ("c"->'d') )"#
    );
}

#[tokio::test]
async fn unique_index_coalesces_nullable_fields() {
    let index = TableIndex::new("TestCollection", fields(&["a", "b"])).with_options(IndexOptions {
        unique: true,
        ..IndexOptions::default()
    });
    assert_eq!(
        create_index(&index).await.unwrap().0,
        r#"CREATE UNIQUE INDEX IF NOT EXISTS "idx_TestCollection_a_b" ON "TestCollection" USING btree ( "a" , COALESCE("b", '') )"#
    );
}

#[tokio::test]
async fn unique_index_casts_nullable_non_text_fields() {
    let index = TableIndex::new("TestCollection", fields(&["b", "n"])).with_options(IndexOptions {
        unique: true,
        ..IndexOptions::default()
    });
    assert_eq!(
        create_index(&index).await.unwrap().0,
        r#"CREATE UNIQUE INDEX IF NOT EXISTS "idx_TestCollection_b_n" ON "TestCollection" USING btree ( COALESCE("b", '') , COALESCE("n"::TEXT, '') )"#
    );
}

#[tokio::test]
async fn partial_filter_binds_values_in_key_order() {
    let filter = serde_json::json!({ "a": { "$gt": 3 }, "b": "test" });
    let index = TableIndex::new("TestCollection", fields(&["a", "b"])).with_options(IndexOptions {
        partial_filter_expression: filter.as_object().cloned(),
        ..IndexOptions::default()
    });
    assert_eq!(
        create_index(&index).await.unwrap(),
        (
            r#"CREATE INDEX IF NOT EXISTS "idx_TestCollection_a_b_filtered" ON "TestCollection" USING btree ( "a" , "b" ) WHERE ( "a" > $1 AND "b" = $2 )"#.to_string(),
            vec![Param::Integer(3), Param::String("test".to_string())]
        )
    );
}

#[tokio::test]
async fn collation_lowercases_every_field() {
    let collation = Collation {
        locale: "en".to_string(),
        strength: 2,
    };
    let index = TableIndex::new("TestCollection", fields(&["b"])).with_options(IndexOptions {
        collation: Some(collation.clone()),
        ..IndexOptions::default()
    });
    assert_eq!(
        create_index(&index).await.unwrap().0,
        r#"CREATE INDEX IF NOT EXISTS "idx_TestCollection_b_ci" ON "TestCollection" USING btree ( LOWER("b") )"#
    );

    let index = TableIndex::new("TestCollection", fields(&["a", "b"])).with_options(IndexOptions {
        unique: true,
        partial_filter_expression: serde_json::json!({ "a": 1 }).as_object().cloned(),
        collation: Some(collation),
        ..IndexOptions::default()
    });
    assert_eq!(
        create_index(&index).await.unwrap().0,
        r#"CREATE UNIQUE INDEX IF NOT EXISTS "idx_TestCollection_a_b_filtered_ci" ON "TestCollection" USING btree ( LOWER("a"::TEXT) , LOWER(COALESCE("b", '')) ) WHERE "a" = $1"#
    );
}

#[tokio::test]
async fn concurrently_changes_only_the_prefix() {
    let index = TableIndex::new("TestCollection", fields(&["a", "b"]));
    let concurrent = index.clone().with_options(IndexOptions {
        concurrently: true,
        ..IndexOptions::default()
    });
    let (plain, _) = create_index(&index).await.unwrap();
    let (concurrent, _) = create_index(&concurrent).await.unwrap();
    assert_eq!(
        concurrent,
        plain.replacen("CREATE INDEX", "CREATE INDEX CONCURRENTLY", 1)
    );
}

#[tokio::test]
async fn names_ignore_directions_and_are_stable() {
    let ascending = TableIndex::new("TestCollection", fields(&["a", "b"]));
    let mixed = TableIndex::new(
        "TestCollection",
        IndexMap::from([
            ("a".to_string(), Direction::Ascending),
            ("b".to_string(), Direction::Descending),
        ]),
    );
    assert_eq!(ascending.name(), mixed.name());
    assert_eq!(
        create_index(&ascending).await.unwrap(),
        create_index(&mixed).await.unwrap()
    );
}

#[test]
fn drop_index() {
    let index = TableIndex::new("TestCollection", fields(&["a", "c.d"]));
    assert_eq!(
        translate_drop_index(&index).0.sql,
        r#"DROP INDEX "idx_TestCollection_a_c__d""#
    );
}

#[tokio::test]
async fn declared_indexes() {
    let configuration = common::configuration().await.unwrap();
    let statements = translate_table_indexes(&configuration.metadata, "Posts")
        .unwrap()
        .into_iter()
        .map(|ddl| ddl.0.sql)
        .collect::<Vec<_>>();
    assert_eq!(
        statements,
        vec![
            r#"CREATE INDEX IF NOT EXISTS "idx_Posts_userId_postedAt" ON "Posts" USING btree ( "userId" , "postedAt" )"#.to_string(),
            r#"CREATE INDEX IF NOT EXISTS "idx_Posts_title_ci" ON "Posts" USING btree ( LOWER("title") )"#.to_string(),
        ]
    );

    let statements = translate_table_indexes(&configuration.metadata, "TestCollection").unwrap();
    assert_eq!(
        statements[0].0.sql,
        r#"CREATE UNIQUE INDEX CONCURRENTLY IF NOT EXISTS "idx_TestCollection_b" ON "TestCollection" USING btree ( COALESCE("b", '') )"#
    );
}

#[tokio::test]
async fn invalid_indexes() {
    let unique_gin = TableIndex::new("TestCollection", fields(&["c.d"])).with_options(IndexOptions {
        unique: true,
        ..IndexOptions::default()
    });
    assert!(matches!(
        create_index(&unique_gin).await,
        Err(Error::NotSupported(_))
    ));

    let not_json = TableIndex::new("TestCollection", fields(&["b.x"]));
    assert_eq!(
        create_index(&not_json).await,
        Err(Error::NotAJsonColumn {
            table: "TestCollection".to_string(),
            column: "b".to_string(),
        })
    );

    let unknown = TableIndex::new("TestCollection", fields(&["missing"]));
    assert_eq!(
        create_index(&unknown).await,
        Err(Error::ColumnNotFound {
            table: "TestCollection".to_string(),
            column: "missing".to_string(),
        })
    );

    let no_table = TableIndex::new("Nope", fields(&["a"]));
    assert_eq!(
        create_index(&no_table).await,
        Err(Error::TableNotFound("Nope".to_string()))
    );
}
