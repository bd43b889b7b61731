//! Team aggregation
//!
//! Groups validated records by team and computes distributional statistics
//! for quantitative columns plus registered custom metrics. Aggregation is
//! deliberately lenient where validation was strict: stray non-numeric
//! values in a quantitative column are excluded rather than errors, since
//! everything here already passed validation. Aggregates are rebuilt from
//! scratch on every run, never mutated incrementally.

use crate::flatten::flatten_schema;
use crate::metrics::MetricRegistry;
use crate::schema::{Schema, StatType};
use crate::stats::QuantStats;
use crate::validate::ValidatedRecord;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// One team's matches as a table: one row per match, observed columns only
pub struct TeamTable<'a> {
    /// Flattened variables of each of the team's matches
    pub rows: Vec<&'a IndexMap<String, Value>>,
    /// Observed columns in first-encounter order, with their declared
    /// statistical type (`None` when the schema does not declare the column)
    pub columns: IndexMap<String, Option<StatType>>,
}

impl<'a> TeamTable<'a> {
    fn build(
        records: &[&'a ValidatedRecord],
        types: &IndexMap<String, StatType>,
    ) -> TeamTable<'a> {
        let mut columns: IndexMap<String, Option<StatType>> = IndexMap::new();
        let rows: Vec<_> = records.iter().map(|r| &r.variables).collect();
        for row in &rows {
            for key in row.keys() {
                if !columns.contains_key(key) {
                    columns.insert(key.clone(), types.get(key).copied());
                }
            }
        }
        TeamTable { rows, columns }
    }

    /// Values present for a column, one per match that recorded it.
    pub fn column_values(&self, key: &str) -> Vec<&Value> {
        self.rows.iter().filter_map(|row| row.get(key)).collect()
    }

    /// Numeric values for a column; non-numeric strays are excluded.
    pub fn numeric_column(&self, key: &str) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(key).and_then(Value::as_f64))
            .collect()
    }
}

/// Aggregated output for one team
#[derive(Debug, Clone, Serialize)]
pub struct TeamAggregate {
    pub match_count: usize,
    /// Raw value sequence per observed column
    pub values: IndexMap<String, Vec<Value>>,
    /// Distributional statistics per quantitative column
    pub stats: IndexMap<String, QuantStats>,
    /// Custom metric outputs, in registry order
    pub metrics: IndexMap<String, f64>,
}

/// Group validated records by the metadata field designating team identity.
///
/// Team identifiers are stringified; records without the field are skipped
/// with a warning (possible only under the lenient validation mode).
pub fn group_by_team<'a>(
    records: &'a [ValidatedRecord],
    team_key: &str,
) -> BTreeMap<String, Vec<&'a ValidatedRecord>> {
    let mut groups: BTreeMap<String, Vec<&ValidatedRecord>> = BTreeMap::new();
    for record in records {
        let team = match record.metadata.get(team_key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                warn!("Record without '{team_key}' metadata skipped during grouping");
                continue;
            }
        };
        groups.entry(team).or_default().push(record);
    }
    groups
}

/// Aggregate a full batch of validated records per team.
pub fn aggregate(
    records: &[ValidatedRecord],
    schema: &Schema,
    registry: &MetricRegistry,
    team_key: &str,
) -> BTreeMap<String, TeamAggregate> {
    let types: IndexMap<String, StatType> = flatten_schema(&schema.variables)
        .into_iter()
        .map(|(key, leaf)| (key, leaf.stat_type))
        .collect();

    group_by_team(records, team_key)
        .into_iter()
        .map(|(team, group)| (team, aggregate_team(&group, &types, registry)))
        .collect()
}

/// Aggregate one team's record set. A team with zero matches yields
/// `match_count = 0` and no statistics or metrics.
pub fn aggregate_team(
    records: &[&ValidatedRecord],
    types: &IndexMap<String, StatType>,
    registry: &MetricRegistry,
) -> TeamAggregate {
    if records.is_empty() {
        return TeamAggregate {
            match_count: 0,
            values: IndexMap::new(),
            stats: IndexMap::new(),
            metrics: IndexMap::new(),
        };
    }

    let table = TeamTable::build(records, types);

    let mut values = IndexMap::new();
    let mut stats = IndexMap::new();
    for (key, stat_type) in &table.columns {
        values.insert(
            key.clone(),
            table.column_values(key).into_iter().cloned().collect(),
        );
        if *stat_type == Some(StatType::Quantitative) {
            if let Some(summary) = QuantStats::from_values(&table.numeric_column(key)) {
                stats.insert(key.clone(), summary);
            }
        }
    }

    TeamAggregate {
        match_count: table.rows.len(),
        values,
        stats,
        metrics: registry.evaluate(&table),
    }
}
