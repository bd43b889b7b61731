//! Custom per-team metric registry
//!
//! Metrics are an explicit name-to-closure map populated at startup and
//! iterated during aggregation; new metrics are added by registering them,
//! never by touching the aggregation loop.

use crate::aggregate::TeamTable;
use crate::schema::StatType;
use crate::stats::{mean, sample_std_dev};
use indexmap::IndexMap;
use serde_json::Value;

/// Column group summed per match for the auto coral totals.
pub const AUTO_CORAL_COLUMNS: [&str; 4] = [
    "autoCoral.L1",
    "autoCoral.L2",
    "autoCoral.L3",
    "autoCoral.L4",
];

/// Column group summed per match for the teleop coral totals.
pub const TELE_CORAL_COLUMNS: [&str; 4] = [
    "teleCoral.L1",
    "teleCoral.L2",
    "teleCoral.L3",
    "teleCoral.L4",
];

/// A per-team scalar metric over the team's full tabular data
pub type MetricFn = Box<dyn Fn(&TeamTable) -> f64 + Send + Sync>;

/// Named metric set evaluated for every team during aggregation
#[derive(Default)]
pub struct MetricRegistry {
    metrics: IndexMap<String, MetricFn>,
}

impl MetricRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the reference metric set installed.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("consistency_score", consistency_score);
        registry.register("auto_coral_total_mean", |t: &TeamTable| {
            mean(&group_sums_per_match(t, &AUTO_CORAL_COLUMNS)).unwrap_or(0.0)
        });
        registry.register("auto_coral_total_max", |t: &TeamTable| {
            max_of(&group_sums_per_match(t, &AUTO_CORAL_COLUMNS))
        });
        registry.register("tele_coral_total_mean", |t: &TeamTable| {
            mean(&group_sums_per_match(t, &TELE_CORAL_COLUMNS)).unwrap_or(0.0)
        });
        registry.register("tele_coral_total_max", |t: &TeamTable| {
            max_of(&group_sums_per_match(t, &TELE_CORAL_COLUMNS))
        });
        registry
    }

    /// Register a metric under a unique name; re-registering replaces it.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        metric: impl Fn(&TeamTable) -> f64 + Send + Sync + 'static,
    ) {
        self.metrics.insert(name.into(), Box::new(metric));
    }

    /// Evaluate every registered metric against one team's table.
    pub fn evaluate(&self, table: &TeamTable) -> IndexMap<String, f64> {
        self.metrics
            .iter()
            .map(|(name, metric)| (name.clone(), metric(table)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Per-team consistency score: a type-appropriate homogeneity measure per
/// column, averaged across all scored columns, rounded to 3 decimals.
///
/// Quantitative columns score `1 - min(cv, 1)` with `cv = std_dev / mean`;
/// a zero mean counts as fully inconsistent (cv = 1). Categorical columns
/// score the fraction of matches holding the modal value, binary columns
/// the fraction holding the majority value.
pub fn consistency_score(table: &TeamTable) -> f64 {
    let mut scores = Vec::new();
    for (key, stat_type) in &table.columns {
        let score = match stat_type {
            Some(StatType::Quantitative) => quantitative_consistency(&table.numeric_column(key)),
            Some(StatType::Categorical) => modal_share(table, key),
            Some(StatType::Binary) => majority_share(table, key),
            None => None,
        };
        if let Some(score) = score {
            scores.push(score);
        }
    }
    match mean(&scores) {
        Some(avg) => (avg * 1000.0).round() / 1000.0,
        None => 0.0,
    }
}

fn quantitative_consistency(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    // a single observation has zero spread
    let std = sample_std_dev(values).unwrap_or(0.0);
    let cv = if m == 0.0 { 1.0 } else { std / m };
    Some(1.0 - cv.min(1.0))
}

fn modal_share(table: &TeamTable, key: &str) -> Option<f64> {
    let values = table.column_values(key);
    if values.is_empty() {
        return None;
    }
    let mut counts: IndexMap<&Value, usize> = IndexMap::new();
    for value in &values {
        *counts.entry(*value).or_insert(0) += 1;
    }
    let most_common = counts.values().copied().max()?;
    Some(most_common as f64 / table.rows.len() as f64)
}

fn majority_share(table: &TeamTable, key: &str) -> Option<f64> {
    let rows = table.rows.len();
    if rows == 0 {
        return None;
    }
    let trues = table
        .column_values(key)
        .iter()
        .filter(|v| v.as_bool() == Some(true))
        .count();
    Some(trues.max(rows - trues) as f64 / rows as f64)
}

/// Per-match sums over a fixed column group; missing columns count 0 and
/// booleans 1/0. A team with none of the named columns sums to all zeros.
pub fn group_sums_per_match(table: &TeamTable, columns: &[&str]) -> Vec<f64> {
    table
        .rows
        .iter()
        .map(|row| row_sum(row, columns))
        .collect()
}

/// Sum a fixed column group within one match's flattened variables.
pub fn row_sum(row: &IndexMap<String, Value>, columns: &[&str]) -> f64 {
    columns
        .iter()
        .map(|col| match row.get(*col) {
            Some(Value::Bool(b)) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Some(value) => value.as_f64().unwrap_or(0.0),
            None => 0.0,
        })
        .sum()
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NAN, f64::max).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::json;

    fn table_from(rows: Vec<IndexMap<String, Value>>, types: Vec<(&str, StatType)>) -> OwnedTable {
        let columns: IndexMap<String, Option<StatType>> = rows
            .iter()
            .flat_map(|r| r.keys())
            .map(|k| {
                let t = types
                    .iter()
                    .find(|(name, _)| *name == k.as_str())
                    .map(|(_, t)| *t);
                (k.clone(), t)
            })
            .collect();
        OwnedTable { rows, columns }
    }

    // TeamTable borrows rows; tests own them here and lend them out.
    struct OwnedTable {
        rows: Vec<IndexMap<String, Value>>,
        columns: IndexMap<String, Option<StatType>>,
    }

    impl OwnedTable {
        fn as_table(&self) -> TeamTable<'_> {
            TeamTable {
                rows: self.rows.iter().collect(),
                columns: self.columns.clone(),
            }
        }
    }

    fn row(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_constant_column_is_fully_consistent() {
        let owned = table_from(
            vec![
                row(&[("score", json!(5))]),
                row(&[("score", json!(5))]),
                row(&[("score", json!(5))]),
            ],
            vec![("score", StatType::Quantitative)],
        );
        assert_eq!(consistency_score(&owned.as_table()), 1.0);
    }

    #[test]
    fn test_zero_mean_counts_as_inconsistent() {
        let owned = table_from(
            vec![
                row(&[("delta", json!(-1.0))]),
                row(&[("delta", json!(1.0))]),
            ],
            vec![("delta", StatType::Quantitative)],
        );
        assert_eq!(consistency_score(&owned.as_table()), 0.0);
    }

    #[test]
    fn test_categorical_and_binary_consistency() {
        let owned = table_from(
            vec![
                row(&[("level", json!("L2")), ("climbed", json!(true))]),
                row(&[("level", json!("L2")), ("climbed", json!(true))]),
                row(&[("level", json!("L3")), ("climbed", json!(false))]),
                row(&[("level", json!("L2")), ("climbed", json!(true))]),
            ],
            vec![
                ("level", StatType::Categorical),
                ("climbed", StatType::Binary),
            ],
        );
        // level: 3/4 modal share, climbed: 3/4 majority share -> avg 0.75
        assert_eq!(consistency_score(&owned.as_table()), 0.75);
    }

    #[test]
    fn test_group_sums_and_default_metrics() {
        let owned = table_from(
            vec![
                row(&[
                    ("autoCoral.L1", json!(2)),
                    ("autoCoral.L2", json!(1)),
                ]),
                row(&[
                    ("autoCoral.L1", json!(4)),
                    ("autoCoral.L2", json!(0)),
                ]),
            ],
            vec![
                ("autoCoral.L1", StatType::Quantitative),
                ("autoCoral.L2", StatType::Quantitative),
            ],
        );
        let table = owned.as_table();
        assert_eq!(group_sums_per_match(&table, &AUTO_CORAL_COLUMNS), vec![3.0, 4.0]);

        let metrics = MetricRegistry::with_defaults().evaluate(&table);
        assert_eq!(metrics["auto_coral_total_mean"], 3.5);
        assert_eq!(metrics["auto_coral_total_max"], 4.0);
        // no tele columns present: both default to 0
        assert_eq!(metrics["tele_coral_total_mean"], 0.0);
        assert_eq!(metrics["tele_coral_total_max"], 0.0);
    }

    #[test]
    fn test_registry_is_extensible() {
        let mut registry = MetricRegistry::new();
        registry.register("match_count", |t: &TeamTable| t.rows.len() as f64);
        let owned = table_from(vec![row(&[("x", json!(1))])], vec![]);
        let metrics = registry.evaluate(&owned.as_table());
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics["match_count"], 1.0);
    }
}
