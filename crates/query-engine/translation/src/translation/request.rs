//! The request for a fragment query.

use std::fmt;

use indexmap::IndexMap;
use query_engine_metadata::metadata::{Collation, Direction};
use serde::{Deserialize, Deserializer, Serialize};

/// Fetch the rows of a named fragment's table that match a selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentQueryRequest {
    /// The name of the fragment describing the fields to fetch.
    pub fragment: String,
    #[serde(default)]
    pub selector: Selector,
    /// Sort fields, in order of precedence.
    #[serde(default)]
    pub sort: IndexMap<String, Direction>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub skip: Option<u32>,
    /// Compare textual columns case-insensitively.
    #[serde(default)]
    pub collation: Option<Collation>,
    /// Values for relations and computed fields that read a resolver argument.
    #[serde(default, deserialize_with = "deserialize_unique_keys")]
    pub resolver_args: IndexMap<String, serde_json::Value>,
}

impl FragmentQueryRequest {
    /// A request for every row, in table order.
    pub fn new(fragment: impl Into<String>) -> Self {
        FragmentQueryRequest {
            fragment: fragment.into(),
            selector: Selector::default(),
            sort: IndexMap::new(),
            limit: None,
            skip: None,
            collation: None,
            resolver_args: IndexMap::new(),
        }
    }
}

/// Which rows to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selector {
    /// Shorthand for `{"_id": <id>}`.
    Id(String),
    /// A Mongo-style filter.
    Filter(serde_json::Map<String, serde_json::Value>),
}

impl Default for Selector {
    fn default() -> Self {
        Selector::Filter(serde_json::Map::new())
    }
}

/// Deserialize a map, failing on the first key that appears twice instead of
/// silently keeping the last value.
fn deserialize_unique_keys<'de, D>(
    deserializer: D,
) -> Result<IndexMap<String, serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, MapAccess, Visitor};

    struct UniqueKeysVisitor;

    impl<'de> Visitor<'de> for UniqueKeysVisitor {
        type Value = IndexMap<String, serde_json::Value>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map of resolver arguments")
        }

        fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
        where
            M: MapAccess<'de>,
        {
            let mut args = IndexMap::new();
            while let Some((key, value)) = map.next_entry::<String, serde_json::Value>()? {
                if args.contains_key(&key) {
                    return Err(de::Error::custom(format!(
                        "duplicate resolver argument '{key}'"
                    )));
                }
                args.insert(key, value);
            }
            Ok(args)
        }
    }

    deserializer.deserialize_map(UniqueKeysVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request: FragmentQueryRequest =
            serde_json::from_str(r#"{"fragment": "PostsList"}"#).unwrap();
        assert_eq!(request, FragmentQueryRequest::new("PostsList"));
    }

    #[test]
    fn test_string_selector_is_an_id() {
        let request: FragmentQueryRequest = serde_json::from_str(
            r#"{"fragment": "PostsList", "selector": "abc", "sort": {"postedAt": -1}, "resolverArgs": {"tagId": "t1"}}"#,
        )
        .unwrap();
        assert_eq!(request.selector, Selector::Id("abc".to_string()));
        assert_eq!(request.sort.get("postedAt"), Some(&Direction::Descending));
        assert_eq!(
            request.resolver_args.get("tagId"),
            Some(&serde_json::json!("t1"))
        );
    }

    #[test]
    fn test_duplicate_resolver_args_are_rejected() {
        let error = serde_json::from_str::<FragmentQueryRequest>(
            r#"{"fragment": "PostsList", "resolverArgs": {"tagId": "a", "tagId": "b"}}"#,
        )
        .unwrap_err();
        assert!(error
            .to_string()
            .contains("duplicate resolver argument 'tagId'"));
    }
}
