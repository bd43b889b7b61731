//! Schema model for the expected data structure document
//!
//! The schema document is a nested JSON object with top-level `metadata` and
//! `variables` branches. Any object carrying the sentinel key
//! `statistical_data_type` is a leaf; everything else is a branch whose
//! children are parsed recursively. Parsing happens exactly once, producing
//! a closed tagged-variant tree; downstream code never re-inspects raw JSON
//! structure to decide leaf vs. branch.
//!
//! Malformations are collected exhaustively (every fault, with its dotted
//! path) and reported together as a single fatal error, so schema authors
//! see all problems in one run.

use crate::error::{Error, Result};
use crate::flatten::join_path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Sentinel key marking a schema object as a leaf.
pub const STAT_TYPE_KEY: &str = "statistical_data_type";

/// Key holding the enumerated value set on categorical leaves.
pub const VALUES_KEY: &str = "values";

/// Statistical data type of a schema leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatType {
    /// Numeric (integer or floating point)
    Quantitative,
    /// Enumerated string
    Categorical,
    /// Boolean
    Binary,
}

impl StatType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "quantitative" => Some(StatType::Quantitative),
            "categorical" => Some(StatType::Categorical),
            "binary" => Some(StatType::Binary),
            _ => None,
        }
    }
}

impl fmt::Display for StatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatType::Quantitative => "quantitative",
            StatType::Categorical => "categorical",
            StatType::Binary => "binary",
        };
        f.write_str(s)
    }
}

/// Terminal schema node
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaLeaf {
    /// Declared statistical type
    pub stat_type: StatType,
    /// Enumerated value set; present only on categorical leaves
    pub values: Option<Vec<String>>,
}

/// A schema node: either a typed leaf or a branch of named children
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// Terminal node carrying a statistical type
    Leaf(SchemaLeaf),
    /// Interior node; children keep document declaration order
    Branch(IndexMap<String, SchemaNode>),
}

/// Parsed expected data structure
#[derive(Debug, Clone)]
pub struct Schema {
    /// Metadata branch (flat or shallowly nested)
    pub metadata: SchemaNode,
    /// Variables branch (arbitrarily nested)
    pub variables: SchemaNode,
}

/// A single schema malformation, with the dotted path of the offending node
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaFault {
    #[error("'{path}': expected an object, got {got}")]
    NotAnObject { path: String, got: &'static str },

    #[error("'{path}': node has no {STAT_TYPE_KEY} and no children")]
    EmptyNode { path: String },

    #[error("'{path}': {STAT_TYPE_KEY} must be a string")]
    StatTypeNotString { path: String },

    #[error("'{path}': unknown {STAT_TYPE_KEY} '{given}': must be one of quantitative, categorical, binary")]
    UnknownStatType { path: String, given: String },

    #[error("'{path}': categorical leaf requires a non-empty '{VALUES_KEY}' list of strings")]
    InvalidValues { path: String },

    #[error("'{path}': duplicate entry '{value}' in '{VALUES_KEY}'")]
    DuplicateValue { path: String, value: String },

    #[error("'{path}': '{VALUES_KEY}' is exactly true/false; declare this leaf binary instead")]
    BooleanValues { path: String },
}

impl Schema {
    /// Parse a schema document, collecting every malformation found.
    ///
    /// The root must be an object with `metadata` and `variables` branches.
    /// On any fault the whole parse fails with `Error::Schema` carrying all
    /// faults.
    pub fn parse(doc: &Value) -> Result<Schema> {
        let mut faults = Vec::new();

        let root = match doc.as_object() {
            Some(obj) => obj,
            None => {
                return Err(Error::Schema(vec![SchemaFault::NotAnObject {
                    path: String::new(),
                    got: value_kind(doc),
                }]))
            }
        };

        let metadata = match root.get("metadata") {
            Some(v) => parse_node(v, "metadata", &mut faults),
            None => {
                faults.push(SchemaFault::EmptyNode {
                    path: "metadata".to_string(),
                });
                None
            }
        };
        let variables = match root.get("variables") {
            Some(v) => parse_node(v, "variables", &mut faults),
            None => {
                faults.push(SchemaFault::EmptyNode {
                    path: "variables".to_string(),
                });
                None
            }
        };

        if !faults.is_empty() {
            return Err(Error::Schema(faults));
        }

        // Both are Some here: parse_node only returns None after pushing a fault.
        Ok(Schema {
            metadata: metadata.expect("metadata parsed"),
            variables: variables.expect("variables parsed"),
        })
    }
}

/// Human-readable JSON value kind, used in fault and warning messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_node(value: &Value, path: &str, faults: &mut Vec<SchemaFault>) -> Option<SchemaNode> {
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => {
            faults.push(SchemaFault::NotAnObject {
                path: path.to_string(),
                got: value_kind(value),
            });
            return None;
        }
    };

    if obj.contains_key(STAT_TYPE_KEY) {
        return parse_leaf(obj, path, faults).map(SchemaNode::Leaf);
    }

    if obj.is_empty() {
        faults.push(SchemaFault::EmptyNode {
            path: path.to_string(),
        });
        return None;
    }

    let mut children = IndexMap::new();
    let mut ok = true;
    for (key, child) in obj {
        match parse_node(child, &join_path(path, key), faults) {
            Some(node) => {
                children.insert(key.clone(), node);
            }
            None => ok = false,
        }
    }
    ok.then(|| SchemaNode::Branch(children))
}

fn parse_leaf(
    obj: &serde_json::Map<String, Value>,
    path: &str,
    faults: &mut Vec<SchemaFault>,
) -> Option<SchemaLeaf> {
    let stat_type = match &obj[STAT_TYPE_KEY] {
        Value::String(s) => match StatType::parse(s) {
            Some(t) => t,
            None => {
                faults.push(SchemaFault::UnknownStatType {
                    path: path.to_string(),
                    given: s.clone(),
                });
                return None;
            }
        },
        _ => {
            faults.push(SchemaFault::StatTypeNotString {
                path: path.to_string(),
            });
            return None;
        }
    };

    // `values` only matters on categorical leaves; elsewhere it is ignored.
    if stat_type != StatType::Categorical {
        return Some(SchemaLeaf {
            stat_type,
            values: None,
        });
    }

    let entries = match obj.get(VALUES_KEY).and_then(Value::as_array) {
        Some(arr) if !arr.is_empty() => arr,
        _ => {
            faults.push(SchemaFault::InvalidValues {
                path: path.to_string(),
            });
            return None;
        }
    };

    let mut values = Vec::with_capacity(entries.len());
    let mut ok = true;
    for entry in entries {
        match entry.as_str() {
            Some(s) => {
                if values.iter().any(|v| v == s) {
                    faults.push(SchemaFault::DuplicateValue {
                        path: path.to_string(),
                        value: s.to_string(),
                    });
                    ok = false;
                } else {
                    values.push(s.to_string());
                }
            }
            None => {
                faults.push(SchemaFault::InvalidValues {
                    path: path.to_string(),
                });
                ok = false;
            }
        }
    }

    if ok && is_boolean_value_set(&values) {
        faults.push(SchemaFault::BooleanValues {
            path: path.to_string(),
        });
        ok = false;
    }

    ok.then_some(SchemaLeaf {
        stat_type,
        values: Some(values),
    })
}

/// True when the value set is exactly {"true","false"} up to case, which
/// means the leaf should have been declared binary.
fn is_boolean_value_set(values: &[String]) -> bool {
    values.len() == 2
        && values.iter().any(|v| v.eq_ignore_ascii_case("true"))
        && values.iter().any(|v| v.eq_ignore_ascii_case("false"))
}
