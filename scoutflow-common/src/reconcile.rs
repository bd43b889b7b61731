//! Reconciliation scorer
//!
//! Cross-references locally aggregated per-alliance coral totals against the
//! authoritative match results and accumulates a penalty count per operator.
//! Blame for a mismatched facet is spread across every operator who scouted
//! that alliance in that match, a deliberately coarse convention inherited
//! from the data-entry workflow.

use crate::error::Result;
use crate::metrics::{row_sum, AUTO_CORAL_COLUMNS, TELE_CORAL_COLUMNS};
use crate::validate::{ValidatedRecord, UNKNOWN_OPERATOR};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Error opportunities each entered record contributes (one auto-count and
/// one tele-count facet per alliance, not four); the penalty-rate divisor.
pub const ERROR_OPPORTUNITIES_PER_ENTRY: u64 = 2;

/// Z value for the 95% binomial confidence interval.
pub const Z_95: f64 = 1.96;

/// One of the two competing sides in a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alliance {
    Blue,
    Red,
}

impl Alliance {
    /// Alliance from a robot position string: anything containing "red"
    /// (case-insensitive) is red, everything else blue.
    pub fn from_position(position: &str) -> Alliance {
        if position.to_ascii_lowercase().contains("red") {
            Alliance::Red
        } else {
            Alliance::Blue
        }
    }
}

/// Locally aggregated totals for one alliance in one match
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AllianceTotals {
    pub auto_coral_count: f64,
    pub tele_coral_count: f64,
}

/// One match's local aggregation: totals and contributing operators per side
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchEntry {
    pub blue: AllianceTotals,
    pub red: AllianceTotals,
    pub blue_operators: BTreeSet<String>,
    pub red_operators: BTreeSet<String>,
}

impl MatchEntry {
    fn totals_mut(&mut self, alliance: Alliance) -> (&mut AllianceTotals, &mut BTreeSet<String>) {
        match alliance {
            Alliance::Blue => (&mut self.blue, &mut self.blue_operators),
            Alliance::Red => (&mut self.red, &mut self.red_operators),
        }
    }

    fn operators(&self, alliance: Alliance) -> &BTreeSet<String> {
        match alliance {
            Alliance::Blue => &self.blue_operators,
            Alliance::Red => &self.red_operators,
        }
    }
}

/// Per-match local alliance summary over a cleaned batch
#[derive(Debug, Default, Serialize)]
pub struct MatchAllianceSummary {
    pub matches: BTreeMap<u32, MatchEntry>,
}

/// Build the local per-match alliance summary from cleaned records.
///
/// Records without a parseable match number are skipped with a warning;
/// they cannot be compared against the external source.
pub fn summarize_matches(
    records: &[ValidatedRecord],
    match_number_key: &str,
    position_key: &str,
    operator_key: &str,
) -> MatchAllianceSummary {
    let mut summary = MatchAllianceSummary::default();
    for record in records {
        let match_number = match record.metadata.get(match_number_key).and_then(match_number) {
            Some(n) => n,
            None => {
                warn!("Record without a parseable '{match_number_key}' skipped in reconciliation");
                continue;
            }
        };
        let alliance = record
            .metadata
            .get(position_key)
            .and_then(Value::as_str)
            .map(Alliance::from_position)
            .unwrap_or(Alliance::Blue);
        let operator = operator_name(record, operator_key);

        let entry = summary.matches.entry(match_number).or_default();
        let (totals, operators) = entry.totals_mut(alliance);
        totals.auto_coral_count += row_sum(&record.variables, &AUTO_CORAL_COLUMNS);
        totals.tele_coral_count += row_sum(&record.variables, &TELE_CORAL_COLUMNS);
        operators.insert(operator);
    }
    summary
}

fn match_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn operator_name(record: &ValidatedRecord, operator_key: &str) -> String {
    match record.metadata.get(operator_key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => UNKNOWN_OPERATOR.to_string(),
    }
}

/// Total cleaned entries per operator, the penalty-rate denominator basis.
pub fn count_entries(records: &[ValidatedRecord], operator_key: &str) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(operator_name(record, operator_key)).or_insert(0) += 1;
    }
    counts
}

/// Authoritative score counts for one alliance; absent facets are not compared
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RemoteAlliance {
    pub auto_coral_count: Option<f64>,
    pub teleop_coral_count: Option<f64>,
}

/// Authoritative alliance score breakdown for one match
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteBreakdown {
    pub blue: RemoteAlliance,
    pub red: RemoteAlliance,
}

/// External authoritative match-results source
pub trait MatchLookup {
    /// Alliance score breakdown for one match of an event. No availability
    /// guarantee: a failure here skips the match, never aborts the run.
    fn alliance_totals(
        &self,
        year: u16,
        event_key: &str,
        match_number: u32,
    ) -> Result<RemoteBreakdown>;
}

/// Penalty statistics for one operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyRecord {
    pub total_entries: u64,
    pub max_possible_errors: u64,
    pub penalty_count: u64,
    pub penalty_percent: f64,
    pub ci_lower_percent: f64,
    pub ci_upper_percent: f64,
}

impl PenaltyRecord {
    /// Penalty rate with its 95% binomial confidence interval, clamped to
    /// [0, 100] and reported as percentages.
    pub fn from_counts(total_entries: u64, penalty_count: u64) -> PenaltyRecord {
        let max_possible_errors = total_entries * ERROR_OPPORTUNITIES_PER_ENTRY;
        let (p, se) = if max_possible_errors == 0 {
            (0.0, 0.0)
        } else {
            let p = penalty_count as f64 / max_possible_errors as f64;
            (p, (p * (1.0 - p) / max_possible_errors as f64).sqrt())
        };
        PenaltyRecord {
            total_entries,
            max_possible_errors,
            penalty_count,
            penalty_percent: p * 100.0,
            ci_lower_percent: (p - Z_95 * se).max(0.0) * 100.0,
            ci_upper_percent: (p + Z_95 * se).min(1.0) * 100.0,
        }
    }
}

/// Reconciliation output: raw penalty counts and per-operator statistics
#[derive(Debug, Default)]
pub struct PenaltyReport {
    pub counts: BTreeMap<String, u64>,
    pub records: BTreeMap<String, PenaltyRecord>,
    /// Matches skipped because the external lookup failed
    pub skipped_matches: Vec<u32>,
}

/// Score every operator against the external source.
///
/// For each match, the four facets (blue/red x auto/tele) are compared; a
/// facet with an authoritative value differing from the local sum penalizes
/// every operator who contributed to that alliance in that match. A failed
/// lookup skips that whole match. `total_entries` comes from the operators'
/// own cleaned records, independent of lookup success.
pub fn score(
    summary: &MatchAllianceSummary,
    entries_per_operator: &BTreeMap<String, u64>,
    lookup: &dyn MatchLookup,
    year: u16,
    event_key: &str,
) -> PenaltyReport {
    let mut report = PenaltyReport::default();

    for (&match_number, entry) in &summary.matches {
        let remote = match lookup.alliance_totals(year, event_key, match_number) {
            Ok(remote) => remote,
            Err(e) => {
                warn!("Lookup failed for match {match_number}, skipping: {e}");
                report.skipped_matches.push(match_number);
                continue;
            }
        };

        let facets = [
            (Alliance::Blue, "autoCoralCount", remote.blue.auto_coral_count, entry.blue.auto_coral_count),
            (Alliance::Blue, "teleopCoralCount", remote.blue.teleop_coral_count, entry.blue.tele_coral_count),
            (Alliance::Red, "autoCoralCount", remote.red.auto_coral_count, entry.red.auto_coral_count),
            (Alliance::Red, "teleopCoralCount", remote.red.teleop_coral_count, entry.red.tele_coral_count),
        ];
        for (alliance, facet, remote_value, local_value) in facets {
            let Some(remote_value) = remote_value else {
                continue;
            };
            if remote_value != local_value {
                info!(
                    "Mismatch in match {match_number} {alliance:?} {facet}: \
                     scouting = {local_value}, source = {remote_value}"
                );
                for operator in entry.operators(alliance) {
                    *report.counts.entry(operator.clone()).or_insert(0) += 1;
                }
            }
        }
    }

    for (operator, &total_entries) in entries_per_operator {
        let penalty_count = report.counts.get(operator).copied().unwrap_or(0);
        report.records.insert(
            operator.clone(),
            PenaltyRecord::from_counts(total_entries, penalty_count),
        );
    }
    report
}
