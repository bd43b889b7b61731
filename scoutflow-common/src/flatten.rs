//! Flattening engine
//!
//! Converts nested variable trees (schema or data) into flat mappings keyed
//! by dot-joined path segments. For the schema, recursion stops at nodes
//! that declare a statistical type; for data, at any non-object value.
//! Output order is depth-first, field-declaration order of first encounter.
//!
//! FlattenedKey uniqueness across a tree is a schema-authoring contract and
//! is not auto-detected here.

use crate::schema::{SchemaLeaf, SchemaNode};
use indexmap::IndexMap;
use serde_json::Value;

/// Join a path prefix and a field name with `.`; an empty prefix yields the
/// bare field name.
pub fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Flatten a schema subtree into dotted paths mapped to their leaves.
pub fn flatten_schema(node: &SchemaNode) -> IndexMap<String, &SchemaLeaf> {
    let mut out = IndexMap::new();
    walk_schema(node, "", &mut out);
    out
}

fn walk_schema<'a>(node: &'a SchemaNode, prefix: &str, out: &mut IndexMap<String, &'a SchemaLeaf>) {
    match node {
        SchemaNode::Leaf(leaf) => {
            out.insert(prefix.to_string(), leaf);
        }
        SchemaNode::Branch(children) => {
            for (key, child) in children {
                walk_schema(child, &join_path(prefix, key), out);
            }
        }
    }
}

/// Flatten a nested data object into dotted paths mapped to leaf values.
///
/// Every nested object is descended; any non-object value is a leaf. An
/// empty object contributes no entries. A non-object input yields an empty
/// mapping.
pub fn flatten_value(value: &Value) -> IndexMap<String, Value> {
    let mut out = IndexMap::new();
    if let Value::Object(obj) = value {
        for (key, child) in obj {
            walk_value(child, key, &mut out);
        }
    }
    out
}

fn walk_value(value: &Value, prefix: &str, out: &mut IndexMap<String, Value>) {
    match value {
        Value::Object(obj) => {
            for (key, child) in obj {
                walk_value(child, &join_path(prefix, key), out);
            }
        }
        _ => {
            out.insert(prefix.to_string(), value.clone());
        }
    }
}

/// Rebuild a nested object from a flat dotted-path mapping (inverse of
/// [`flatten_value`] when leaf paths are unique).
pub fn nest(flat: &IndexMap<String, Value>) -> Value {
    let mut root = serde_json::Map::new();
    for (path, value) in flat {
        let mut cursor = &mut root;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                cursor.insert(segment.to_string(), value.clone());
            } else {
                cursor = cursor
                    .entry(segment.to_string())
                    .or_insert_with(|| Value::Object(serde_json::Map::new()))
                    .as_object_mut()
                    // unique leaf paths: an interior segment is never also a leaf
                    .expect("interior path segment collides with a leaf");
            }
        }
    }
    Value::Object(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use serde_json::json;

    #[test]
    fn test_flatten_schema_order_and_paths() {
        let doc = json!({
            "metadata": { "m": { "statistical_data_type": "binary" } },
            "variables": {
                "autoCoral": {
                    "L1": { "statistical_data_type": "quantitative" },
                    "L2": { "statistical_data_type": "quantitative" }
                },
                "climb": { "statistical_data_type": "binary" }
            }
        });
        let schema = Schema::parse(&doc).unwrap();
        let flat = flatten_schema(&schema.variables);
        let keys: Vec<_> = flat.keys().cloned().collect();
        assert_eq!(keys, vec!["autoCoral.L1", "autoCoral.L2", "climb"]);
    }

    #[test]
    fn test_flatten_value_stops_at_leaves() {
        let value = json!({
            "autoCoral": { "L1": 3, "L2": 0 },
            "climb": true,
            "notes": "fast cycles"
        });
        let flat = flatten_value(&value);
        assert_eq!(flat["autoCoral.L1"], json!(3));
        assert_eq!(flat["climb"], json!(true));
        assert_eq!(flat["notes"], json!("fast cycles"));
        assert_eq!(flat.len(), 4);
    }

    #[test]
    fn test_empty_nested_object_produces_no_entries() {
        let flat = flatten_value(&json!({ "a": {}, "b": 1 }));
        assert_eq!(flat.len(), 1);
        assert!(flat.contains_key("b"));
    }

    #[test]
    fn test_flatten_nest_round_trip() {
        let original = json!({
            "teleCoral": { "L1": 2, "L2": 5, "deep": { "nested": "x" } },
            "park": false
        });
        let flat = flatten_value(&original);
        assert_eq!(nest(&flat), original);
    }

    #[test]
    fn test_join_path_empty_prefix() {
        assert_eq!(join_path("", "a"), "a");
        assert_eq!(join_path("a", "b"), "a.b");
    }
}
