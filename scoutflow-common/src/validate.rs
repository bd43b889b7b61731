//! Value and record validation
//!
//! A value is checked against its schema leaf per declared statistical type;
//! a record is checked field-by-field against the flattened schema. The
//! record-level policy is all-or-nothing: one missing or invalid declared
//! field voids the whole record. Downstream statistics assume every accepted
//! record is schema-complete, so partial records are worse than no record.
//!
//! Failure reasons accumulate per record (never stop at the first) so a
//! human sees every problem at once, and every warning is attributed to the
//! record's operator for later reliability scoring.

use crate::flatten::{flatten_schema, flatten_value, join_path};
use crate::schema::{value_kind, Schema, SchemaLeaf, StatType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

/// Operator sentinel used when a record does not name one.
pub const UNKNOWN_OPERATOR: &str = "Unknown";

/// A single value-level validation failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueFault {
    #[error("invalid binary value {got} for '{path}': expected true or false")]
    InvalidBinary { path: String, got: String },

    #[error("incorrect type for '{path}': expected categorical (string), got {got}")]
    NotCategorical { path: String, got: &'static str },

    #[error("invalid value {value} for '{path}': expected one of [{}]", .allowed.join(", "))]
    NotInAllowed {
        path: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("incorrect type for '{path}': expected quantitative (number), got {got}")]
    NotNumeric { path: String, got: &'static str },

    #[error("incorrect type for '{path}': got boolean, which is not accepted as a number (binary/quantitative confusion)")]
    BooleanAsNumber { path: String },
}

/// Validate one leaf value against its schema leaf.
///
/// The only coercion performed is binary string-to-bool; categorical checks
/// (string type, enum membership) both run and all failures are reported.
pub fn validate_value(
    path: &str,
    raw: &Value,
    leaf: &SchemaLeaf,
) -> std::result::Result<Value, Vec<ValueFault>> {
    match leaf.stat_type {
        StatType::Binary => validate_binary(path, raw),
        StatType::Categorical => validate_categorical(path, raw, leaf.values.as_deref()),
        StatType::Quantitative => validate_quantitative(path, raw),
    }
}

fn validate_binary(path: &str, raw: &Value) -> std::result::Result<Value, Vec<ValueFault>> {
    match raw {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
        other => Err(vec![ValueFault::InvalidBinary {
            path: path.to_string(),
            got: other.to_string(),
        }]),
    }
}

fn validate_categorical(
    path: &str,
    raw: &Value,
    allowed: Option<&[String]>,
) -> std::result::Result<Value, Vec<ValueFault>> {
    let mut faults = Vec::new();

    if !raw.is_string() {
        faults.push(ValueFault::NotCategorical {
            path: path.to_string(),
            got: value_kind(raw),
        });
    }
    if let Some(allowed) = allowed {
        let member = raw
            .as_str()
            .map(|s| allowed.iter().any(|a| a == s))
            .unwrap_or(false);
        if !member {
            faults.push(ValueFault::NotInAllowed {
                path: path.to_string(),
                value: raw.to_string(),
                allowed: allowed.to_vec(),
            });
        }
    }

    if faults.is_empty() {
        Ok(raw.clone())
    } else {
        Err(faults)
    }
}

fn validate_quantitative(path: &str, raw: &Value) -> std::result::Result<Value, Vec<ValueFault>> {
    match raw {
        Value::Number(_) => Ok(raw.clone()),
        Value::Bool(_) => Err(vec![ValueFault::BooleanAsNumber {
            path: path.to_string(),
        }]),
        other => Err(vec![ValueFault::NotNumeric {
            path: path.to_string(),
            got: value_kind(other),
        }]),
    }
}

/// Record-validation policy, threaded in explicitly (no ambient flags)
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Void the whole record on any missing/invalid declared field
    /// (the strict default); false keeps the passing fields.
    pub void_on_failure: bool,
    /// Metadata field naming the record's operator
    pub operator_key: String,
    /// Top-level passthrough identifier field
    pub id_key: String,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            void_on_failure: true,
            operator_key: "scouterName".to_string(),
            id_key: "_id".to_string(),
        }
    }
}

/// A schema-complete record; constructed only by the validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedRecord {
    /// Passthrough identifier from the raw document, if present
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Flattened metadata fields
    pub metadata: IndexMap<String, Value>,
    /// Flattened variables, keyed by dotted path
    pub variables: IndexMap<String, Value>,
}

/// A record discarded by the void policy, with every reason found
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoidedEntry {
    /// The raw record as received
    pub original: Value,
    /// All accumulated failure reasons, joined
    pub reason: String,
}

/// Terminal outcome for one record
#[derive(Debug, Clone)]
pub enum RecordOutcome {
    Accepted(ValidatedRecord),
    Voided(VoidedEntry),
}

/// Per-record validation report
#[derive(Debug, Clone)]
pub struct RecordReport {
    pub outcome: RecordOutcome,
    /// Operator the record's warnings are attributed to
    pub operator: String,
    pub warnings: Vec<String>,
}

/// Batch validation output
#[derive(Debug, Default)]
pub struct CleanOutcome {
    pub cleaned: Vec<ValidatedRecord>,
    pub voided: Vec<VoidedEntry>,
    pub warnings: Vec<String>,
    /// Warning counts attributed per operator, independent of void outcome
    pub operator_warnings: BTreeMap<String, usize>,
}

/// Record validator built from a parsed schema
pub struct RecordValidator<'a> {
    metadata_schema: IndexMap<String, &'a SchemaLeaf>,
    variable_schema: IndexMap<String, &'a SchemaLeaf>,
    options: ValidationOptions,
}

impl<'a> RecordValidator<'a> {
    pub fn new(schema: &'a Schema, options: ValidationOptions) -> Self {
        Self {
            metadata_schema: flatten_schema(&schema.metadata),
            variable_schema: flatten_schema(&schema.variables),
            options,
        }
    }

    /// Validate one raw record to a terminal outcome.
    ///
    /// Extra fields not declared in the schema are ignored; declared fields
    /// must all be present and valid or the record is voided.
    pub fn validate_record(&self, raw: &Value) -> RecordReport {
        let operator = operator_of(raw, &self.options.operator_key);
        let mut warnings = Vec::new();

        let raw_metadata = flatten_value(raw.get("metadata").unwrap_or(&Value::Null));
        let metadata =
            self.validate_section("metadata", &self.metadata_schema, &raw_metadata, &mut warnings);

        let raw_variables = flatten_value(raw.get("variables").unwrap_or(&Value::Null));
        let variables = self.validate_section(
            "variables",
            &self.variable_schema,
            &raw_variables,
            &mut warnings,
        );

        let outcome = if !warnings.is_empty() && self.options.void_on_failure {
            RecordOutcome::Voided(VoidedEntry {
                original: raw.clone(),
                reason: warnings.join("; "),
            })
        } else {
            RecordOutcome::Accepted(ValidatedRecord {
                id: raw.get(&self.options.id_key).cloned(),
                metadata,
                variables,
            })
        };

        RecordReport {
            outcome,
            operator,
            warnings,
        }
    }

    fn validate_section(
        &self,
        section: &str,
        declared: &IndexMap<String, &'a SchemaLeaf>,
        actual: &IndexMap<String, Value>,
        warnings: &mut Vec<String>,
    ) -> IndexMap<String, Value> {
        let mut validated = IndexMap::new();
        for (key, leaf) in declared {
            let path = join_path(section, key);
            match actual.get(key) {
                None => warnings.push(format!("Missing key '{path}'")),
                Some(value) => match validate_value(&path, value, leaf) {
                    Ok(clean) => {
                        validated.insert(key.clone(), clean);
                    }
                    Err(faults) => {
                        warnings.extend(faults.iter().map(|f| f.to_string()));
                    }
                },
            }
        }
        validated
    }

    /// Validate a whole raw batch, accumulating voided entries and operator
    /// warning counts. Each warning is also emitted as a log line.
    pub fn clean_batch(&self, raw_records: &[Value]) -> CleanOutcome {
        let mut outcome = CleanOutcome::default();
        for raw in raw_records {
            let report = self.validate_record(raw);
            for message in &report.warnings {
                warn!(operator = %report.operator, "{message}");
                *outcome
                    .operator_warnings
                    .entry(report.operator.clone())
                    .or_insert(0) += 1;
            }
            outcome.warnings.extend(report.warnings);
            match report.outcome {
                RecordOutcome::Accepted(record) => outcome.cleaned.push(record),
                RecordOutcome::Voided(entry) => {
                    warn!(operator = %report.operator, "Voided entry: {}", entry.reason);
                    outcome.voided.push(entry);
                }
            }
        }
        outcome
    }
}

/// Operator identifier from record metadata, defaulting to the sentinel.
pub fn operator_of(raw: &Value, operator_key: &str) -> String {
    match raw.get("metadata").and_then(|m| m.get(operator_key)) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => UNKNOWN_OPERATOR.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_schema() -> Schema {
        Schema::parse(&json!({
            "metadata": {
                "scouterName": { "statistical_data_type": "categorical",
                                 "values": ["Ana", "Bo", "Cy"] },
                "robotTeam": { "statistical_data_type": "quantitative" },
                "robotPosition": { "statistical_data_type": "categorical",
                                   "values": ["red_1", "red_2", "blue_1", "blue_2"] }
            },
            "variables": {
                "autoCoral": {
                    "L1": { "statistical_data_type": "quantitative" },
                    "L2": { "statistical_data_type": "quantitative" }
                },
                "branchLevel": { "statistical_data_type": "categorical",
                                 "values": ["L1", "L2", "L3", "L4"] },
                "climbed": { "statistical_data_type": "binary" }
            }
        }))
        .unwrap()
    }

    fn good_record() -> Value {
        json!({
            "_id": "rec-1",
            "metadata": { "scouterName": "Ana", "robotTeam": 254, "robotPosition": "red_1" },
            "variables": {
                "autoCoral": { "L1": 3, "L2": 1 },
                "branchLevel": "L2",
                "climbed": "True"
            }
        })
    }

    fn leaf(stat_type: StatType) -> SchemaLeaf {
        SchemaLeaf {
            stat_type,
            values: None,
        }
    }

    #[test]
    fn test_binary_coercion_idempotence() {
        let l = leaf(StatType::Binary);
        assert_eq!(validate_value("k", &json!(true), &l), Ok(json!(true)));
        assert_eq!(validate_value("k", &json!("true"), &l), Ok(json!(true)));
        assert_eq!(validate_value("k", &json!("True"), &l), Ok(json!(true)));
        assert_eq!(validate_value("k", &json!("FALSE"), &l), Ok(json!(false)));
        assert!(validate_value("k", &json!("maybe"), &l).is_err());
        assert!(validate_value("k", &json!(1), &l).is_err());
    }

    #[test]
    fn test_categorical_enum_enforcement() {
        let l = SchemaLeaf {
            stat_type: StatType::Categorical,
            values: Some(vec!["L1".into(), "L2".into(), "L3".into(), "L4".into()]),
        };
        assert_eq!(validate_value("k", &json!("L2"), &l), Ok(json!("L2")));

        let faults = validate_value("k", &json!("L5"), &l).unwrap_err();
        assert_eq!(faults.len(), 1);
        assert!(faults[0].to_string().contains("L1, L2, L3, L4"));
    }

    #[test]
    fn test_categorical_both_checks_reported() {
        let l = SchemaLeaf {
            stat_type: StatType::Categorical,
            values: Some(vec!["L1".into(), "L2".into()]),
        };
        // Wrong type AND not a member: both failures named.
        let faults = validate_value("k", &json!(5), &l).unwrap_err();
        assert_eq!(faults.len(), 2);
    }

    #[test]
    fn test_quantitative_rejects_bool() {
        let l = leaf(StatType::Quantitative);
        assert_eq!(validate_value("k", &json!(3.5), &l), Ok(json!(3.5)));
        assert_eq!(validate_value("k", &json!(0), &l), Ok(json!(0)));
        let faults = validate_value("k", &json!(true), &l).unwrap_err();
        assert!(faults[0].to_string().contains("boolean"));
        assert!(validate_value("k", &json!("7"), &l).is_err());
    }

    #[test]
    fn test_accepts_fully_valid_record() {
        let schema = test_schema();
        let validator = RecordValidator::new(&schema, ValidationOptions::default());
        let report = validator.validate_record(&good_record());
        assert!(report.warnings.is_empty());
        match report.outcome {
            RecordOutcome::Accepted(record) => {
                assert_eq!(record.id, Some(json!("rec-1")));
                assert_eq!(record.metadata["robotTeam"], json!(254));
                // binary string coerced to a native bool
                assert_eq!(record.variables["climbed"], json!(true));
                assert_eq!(record.variables["autoCoral.L1"], json!(3));
            }
            RecordOutcome::Voided(entry) => panic!("voided: {}", entry.reason),
        }
    }

    #[test]
    fn test_void_on_single_missing_metadata_key() {
        let schema = test_schema();
        let validator = RecordValidator::new(&schema, ValidationOptions::default());
        let mut raw = good_record();
        raw["metadata"].as_object_mut().unwrap().remove("robotTeam");

        let outcome = validator.clean_batch(&[raw]);
        assert!(outcome.cleaned.is_empty());
        assert_eq!(outcome.voided.len(), 1);
        assert!(outcome.voided[0].reason.contains("metadata.robotTeam"));
    }

    #[test]
    fn test_void_reasons_accumulate() {
        let schema = test_schema();
        let validator = RecordValidator::new(&schema, ValidationOptions::default());
        let mut raw = good_record();
        raw["variables"]["branchLevel"] = json!("L9");
        raw["variables"]["climbed"] = json!("maybe");

        let report = validator.validate_record(&raw);
        assert_eq!(report.warnings.len(), 2);
        match report.outcome {
            RecordOutcome::Voided(entry) => {
                assert!(entry.reason.contains("branchLevel"));
                assert!(entry.reason.contains("climbed"));
            }
            RecordOutcome::Accepted(_) => panic!("record should be voided"),
        }
    }

    #[test]
    fn test_extra_fields_ignored() {
        let schema = test_schema();
        let validator = RecordValidator::new(&schema, ValidationOptions::default());
        let mut raw = good_record();
        raw["variables"]["undeclared"] = json!("anything");
        raw["metadata"]["appVersion"] = json!("2.1");

        let report = validator.validate_record(&raw);
        assert!(report.warnings.is_empty());
        match report.outcome {
            RecordOutcome::Accepted(record) => {
                assert!(!record.variables.contains_key("undeclared"));
                assert!(!record.metadata.contains_key("appVersion"));
            }
            RecordOutcome::Voided(entry) => panic!("voided: {}", entry.reason),
        }
    }

    #[test]
    fn test_warnings_attributed_to_operator() {
        let schema = test_schema();
        let validator = RecordValidator::new(&schema, ValidationOptions::default());
        let mut bad = good_record();
        bad["variables"]["climbed"] = json!("maybe");
        let mut anonymous = good_record();
        anonymous["metadata"].as_object_mut().unwrap().remove("scouterName");

        let outcome = validator.clean_batch(&[bad, anonymous]);
        assert_eq!(outcome.operator_warnings["Ana"], 1);
        // removed scouterName is itself a missing declared key
        assert_eq!(outcome.operator_warnings[UNKNOWN_OPERATOR], 1);
        assert_eq!(outcome.voided.len(), 2);
    }

    #[test]
    fn test_lenient_mode_keeps_passing_fields() {
        let schema = test_schema();
        let options = ValidationOptions {
            void_on_failure: false,
            ..ValidationOptions::default()
        };
        let validator = RecordValidator::new(&schema, options);
        let mut raw = good_record();
        raw["variables"]["climbed"] = json!("maybe");

        let report = validator.validate_record(&raw);
        assert_eq!(report.warnings.len(), 1);
        match report.outcome {
            RecordOutcome::Accepted(record) => {
                assert!(!record.variables.contains_key("climbed"));
                assert_eq!(record.variables["branchLevel"], json!("L2"));
            }
            RecordOutcome::Voided(entry) => panic!("voided: {}", entry.reason),
        }
    }
}
