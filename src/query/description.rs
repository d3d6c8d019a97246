//! Structured query descriptions returned by the generation service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An opaque structured query, passed back verbatim for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryDescription(Value);

impl QueryDescription {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The display-relevant parts of the query: fields, filters, limit and sort.
    ///
    /// Entries that are null or empty are left out. Returns `None` when the
    /// description has no `query` object.
    pub fn summary(&self) -> Option<Map<String, Value>> {
        let query = self.0.get("query")?.as_object()?;

        let mut summary = Map::new();
        for (key, source) in [
            ("fields", "fields"),
            ("filters", "filters"),
            ("limit", "limit"),
            ("sort", "sorts"),
        ] {
            if let Some(value) = query.get(source) {
                if !is_blank(value) {
                    summary.insert(key.to_string(), value.clone());
                }
            }
        }
        Some(summary)
    }

    /// Pretty JSON of [`summary`](Self::summary), for display.
    pub fn summary_text(&self) -> Option<String> {
        self.summary()
            .and_then(|s| serde_json::to_string_pretty(&Value::Object(s)).ok())
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_filters_blank_entries() {
        let query = QueryDescription::new(json!({
            "query": {
                "fields": ["users.state", "orders.count"],
                "filters": {},
                "limit": 10,
                "sorts": [{"column_name": "orders.count", "sort_descending": true}],
                "table": "order_items"
            }
        }));

        let summary = query.summary().unwrap();
        let keys: Vec<&str> = summary.keys().map(String::as_str).collect();
        assert_eq!(keys, ["fields", "limit", "sort"]);
        assert_eq!(summary["limit"], json!(10));
    }

    #[test]
    fn test_summary_requires_query_object() {
        assert!(QueryDescription::new(json!({"other": 1})).summary().is_none());
        assert!(QueryDescription::new(json!("text")).summary().is_none());
    }

    #[test]
    fn test_transparent_serialization() {
        let value = json!({"query": {"limit": 1}});
        let query = QueryDescription::new(value.clone());
        assert_eq!(serde_json::to_value(&query).unwrap(), value);
    }
}
