use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use fragment_sql_configuration::Configuration;
use query_engine_metadata::metadata::User;
use query_engine_sql::sql;
use query_engine_translation::translation;
use query_engine_translation::translation::helpers::{AliasGenerator, Env};
use query_engine_translation::translation::request::FragmentQueryRequest;

const GOLDENFILES: &str = "tests/goldenfiles";

/// A request together with the user it runs for.
#[derive(Debug, serde::Deserialize)]
pub struct TestRequest {
    pub current_user: Option<User>,
    pub request: FragmentQueryRequest,
}

/// Load the configuration all translation tests share.
pub async fn configuration() -> anyhow::Result<Configuration> {
    let parsed_configuration =
        fragment_sql_configuration::parse_configuration(GOLDENFILES).await?;
    Ok(fragment_sql_configuration::make_runtime_configuration(
        parsed_configuration,
    )?)
}

/// Translate the request of a golden test and render the SQL with its
/// numbered parameters, for comparison against the snapshot.
pub async fn test_translation(
    testname: &str,
    aliases: &mut dyn AliasGenerator,
) -> anyhow::Result<String> {
    let directory = PathBuf::from(GOLDENFILES).join(testname);
    let configuration = configuration().await?;
    let test_request: TestRequest =
        serde_json::from_str(&fs::read_to_string(directory.join("request.json"))?)?;

    let sql = translate(&configuration, &test_request, aliases)?;
    assert_placeholders_are_contiguous(&sql);

    let params: Vec<(usize, &sql::string::Param)> = sql
        .params
        .iter()
        .enumerate()
        .map(|(i, p)| (i + 1, p))
        .collect();

    Ok(format!("{}\n\n{:?}", sql.sql, params))
}

pub fn translate(
    configuration: &Configuration,
    test_request: &TestRequest,
    aliases: &mut dyn AliasGenerator,
) -> Result<sql::string::SQL, translation::error::Error> {
    let env = Env::new(&configuration.metadata, &configuration.settings);
    translation::query::translate(
        &env,
        &test_request.request,
        test_request.current_user.as_ref(),
        aliases,
    )
}

/// Every bound parameter is referenced, and only bound parameters are.
pub fn assert_placeholders_are_contiguous(sql: &sql::string::SQL) {
    let mut placeholders = BTreeSet::new();
    let mut rest = sql.sql.as_str();
    while let Some(start) = rest.find('$') {
        rest = &rest[start + 1..];
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        if let Ok(index) = digits.parse::<usize>() {
            placeholders.insert(index);
        }
    }
    assert_eq!(
        placeholders,
        (1..=sql.params.len()).collect::<BTreeSet<_>>(),
        "placeholders of {}",
        sql.sql
    );
}
