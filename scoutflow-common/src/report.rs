//! Team performance report rendering
//!
//! Flattens each team's aggregate into a flat metric map for the JSON
//! document, and renders the tabular CSV view: rows are teams, columns the
//! sorted union of every metric name across all teams, missing cells empty.

use crate::aggregate::TeamAggregate;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Flatten one team's aggregate into metric-name → value pairs
/// (`number_of_matches`, `{col}_values`, `{col}_mean`, ..., custom metrics).
pub fn flatten_aggregate(team: &TeamAggregate) -> IndexMap<String, Value> {
    let mut flat = IndexMap::new();
    flat.insert("number_of_matches".to_string(), team.match_count.into());

    for (column, values) in &team.values {
        flat.insert(format!("{column}_values"), Value::Array(values.clone()));
    }
    for (column, stats) in &team.stats {
        flat.insert(format!("{column}_mean"), stats.mean.into());
        flat.insert(
            format!("{column}_std_dev"),
            stats.std_dev.map_or(Value::Null, Value::from),
        );
        flat.insert(format!("{column}_median"), stats.median.into());
        flat.insert(format!("{column}_q1"), stats.q1.into());
        flat.insert(format!("{column}_q3"), stats.q3.into());
        flat.insert(format!("{column}_iqr"), stats.iqr.into());
        flat.insert(format!("{column}_range"), stats.range.into());
        flat.insert(format!("{column}_min"), stats.min.into());
        flat.insert(format!("{column}_max"), stats.max.into());
    }
    for (name, value) in &team.metrics {
        flat.insert(name.clone(), (*value).into());
    }
    flat
}

/// Team performance JSON document: team id → flat metric map.
pub fn performance_document(
    aggregates: &BTreeMap<String, TeamAggregate>,
) -> BTreeMap<String, IndexMap<String, Value>> {
    aggregates
        .iter()
        .map(|(team, aggregate)| (team.clone(), flatten_aggregate(aggregate)))
        .collect()
}

/// Tabular CSV rendering of the performance document.
pub fn performance_csv(aggregates: &BTreeMap<String, TeamAggregate>) -> String {
    let document = performance_document(aggregates);

    let headers: BTreeSet<&String> = document.values().flat_map(|flat| flat.keys()).collect();
    let mut out = String::new();
    out.push_str("team");
    for header in &headers {
        out.push(',');
        out.push_str(&csv_escape(header));
    }
    out.push('\n');

    for (team, flat) in &document {
        out.push_str(&csv_escape(team));
        for header in &headers {
            out.push(',');
            if let Some(value) = flat.get(*header) {
                out.push_str(&csv_escape(&csv_cell(value)));
            }
        }
        out.push('\n');
    }
    out
}

/// CSV cell text for one metric value: null becomes empty, booleans 0/1,
/// arrays a comma-joined list (quoted by escaping).
fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(csv_cell)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

fn csv_escape(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
