//! Schema-agnostic key search over JSON trees
//!
//! Used-resource recovery runs over the JSON form of assembled filters and
//! routes instead of walking each proxy message type, so new filter types need
//! no dedicated extraction code.

use serde_json::Value;

/// Key marking an SDS config block; its companion `name` is the secret name.
pub const SDS_CONFIG_KEY: &str = "sds_config";
/// Key naming the upstream cluster of a route action.
pub const CLUSTER_KEY: &str = "cluster";

/// Where the reported value sits relative to a matching key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Companion<'a> {
    /// A sibling key in the same mapping
    Sibling(&'a str),
    /// The matching key's own value
    Itself,
}

/// Recursive search for every occurrence of `key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeSearch<'a> {
    key: &'a str,
    companion: Companion<'a>,
}

impl<'a> TreeSearch<'a> {
    pub fn new(key: &'a str, companion: Companion<'a>) -> Self {
        Self { key, companion }
    }

    /// Secret names referenced through `sds_config` blocks.
    pub fn sds_secret_names() -> TreeSearch<'static> {
        TreeSearch::new(SDS_CONFIG_KEY, Companion::Sibling("name"))
    }

    /// Cluster names referenced by route actions.
    pub fn cluster_names() -> TreeSearch<'static> {
        TreeSearch::new(CLUSTER_KEY, Companion::Itself)
    }

    /// Collect scalar companions of every match, in traversal order.
    ///
    /// A match does not stop the descent: all values of the matching mapping
    /// are searched as well. Missing or non-scalar companions yield nothing.
    pub fn find(&self, tree: &Value) -> Vec<String> {
        let mut found = Vec::new();
        self.visit(tree, &mut found);
        found
    }

    fn visit(&self, node: &Value, found: &mut Vec<String>) {
        match node {
            Value::Object(map) => {
                if let Some(matched) = map.get(self.key) {
                    let companion = match self.companion {
                        Companion::Sibling(sibling) => map.get(sibling),
                        Companion::Itself => Some(matched),
                    };
                    if let Some(scalar) = companion.and_then(scalar_text) {
                        found.push(scalar);
                    }
                }
                for value in map.values() {
                    self.visit(value, found);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.visit(item, found);
                }
            }
            _ => {}
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_sds_names_at_any_depth() {
        let filter = json!({
            "name": "envoy.filters.http.oauth2",
            "typed_config": {
                "config": {
                    "credentials": {
                        "token_secret": { "name": "edge/oauth/token", "sds_config": { "ads": {} } },
                        "hmac_secret": { "name": "edge/oauth/hmac", "sds_config": { "ads": {} } }
                    }
                }
            }
        });

        let mut names = TreeSearch::sds_secret_names().find(&filter);
        names.sort();
        assert_eq!(names, vec!["edge/oauth/hmac", "edge/oauth/token"]);
    }

    #[test]
    fn cluster_search_reports_the_key_value() {
        let route = json!({
            "match": { "prefix": "/" },
            "route": { "cluster": "backend" }
        });
        assert_eq!(TreeSearch::cluster_names().find(&route), vec!["backend"]);
    }

    #[test]
    fn keeps_descending_below_a_match() {
        let tree = json!({
            "sds_config": { "ads": {}, "nested": { "sds_config": {}, "name": "inner" } },
            "name": "outer"
        });
        assert_eq!(TreeSearch::sds_secret_names().find(&tree), vec!["outer", "inner"]);
    }

    #[test]
    fn searches_inside_sequences() {
        let tree = json!([
            { "route": { "cluster": "a" } },
            [{ "route": { "cluster": "b" } }],
            "cluster"
        ]);
        assert_eq!(TreeSearch::cluster_names().find(&tree), vec!["a", "b"]);
    }

    #[test]
    fn ignores_missing_and_non_scalar_companions() {
        let tree = json!({
            "a": { "sds_config": {} },
            "b": { "sds_config": {}, "name": { "nested": true } },
            "c": { "cluster": ["x"] },
            "d": { "cluster": 7 }
        });
        assert!(TreeSearch::sds_secret_names().find(&tree).is_empty());
        assert_eq!(TreeSearch::cluster_names().find(&tree), vec!["7"]);
    }

    #[test]
    fn scalars_yield_nothing() {
        assert!(TreeSearch::cluster_names().find(&json!("cluster")).is_empty());
        assert!(TreeSearch::cluster_names().find(&Value::Null).is_empty());
    }
}
