//! Pipeline stages wired to the document store
//!
//! Each stage is a pure load → compute → save pass; nothing is written
//! until the stage's computation has fully succeeded.

use anyhow::Result;
use scoutflow_common::config::PipelineConfig;
use scoutflow_common::metrics::MetricRegistry;
use scoutflow_common::tba::TbaClient;
use scoutflow_common::validate::ValidatedRecord;
use scoutflow_common::{aggregate as agg, reconcile, report, store, RecordValidator, Schema};
use serde_json::Value;
use tracing::info;

/// Validate the raw batch and write the cleaned and voided documents.
pub fn clean(config: &PipelineConfig) -> Result<()> {
    info!("Loading schema from {}", config.schema_path.display());
    let schema_doc: Value = store::load_document(&config.schema_path)?;
    let schema = Schema::parse(&schema_doc)?;

    info!("Loading raw data from {}", config.raw_data_path.display());
    let raw: Vec<Value> = store::load_document(&config.raw_data_path)?;

    let validator = RecordValidator::new(&schema, config.validation_options());
    let outcome = validator.clean_batch(&raw);

    info!("Saving cleaned data to {}", config.cleaned_data_path.display());
    store::save_document(&config.cleaned_data_path, &outcome.cleaned)?;
    store::save_document(&config.voided_data_path, &outcome.voided)?;

    info!(
        "Clean finished: {} accepted, {} voided, {} warnings across {} operators",
        outcome.cleaned.len(),
        outcome.voided.len(),
        outcome.warnings.len(),
        outcome.operator_warnings.len(),
    );
    Ok(())
}

/// Aggregate cleaned records into the per-team performance reports.
pub fn aggregate(config: &PipelineConfig) -> Result<()> {
    let schema_doc: Value = store::load_document(&config.schema_path)?;
    let schema = Schema::parse(&schema_doc)?;

    info!("Loading cleaned data from {}", config.cleaned_data_path.display());
    let cleaned: Vec<ValidatedRecord> = store::load_document(&config.cleaned_data_path)?;

    let registry = MetricRegistry::with_defaults();
    let aggregates = agg::aggregate(&cleaned, &schema, &registry, &config.team_key);

    info!(
        "Saving team performance data to {}",
        config.team_performance_json_path.display()
    );
    store::save_document(
        &config.team_performance_json_path,
        &report::performance_document(&aggregates),
    )?;
    store::save_text(
        &config.team_performance_csv_path,
        &report::performance_csv(&aggregates),
    )?;

    info!("Aggregate finished: {} teams processed", aggregates.len());
    Ok(())
}

/// Score operator reliability against The Blue Alliance.
pub fn reconcile(config: &PipelineConfig) -> Result<()> {
    info!("Loading cleaned data from {}", config.cleaned_data_path.display());
    let cleaned: Vec<ValidatedRecord> = store::load_document(&config.cleaned_data_path)?;

    let summary = reconcile::summarize_matches(
        &cleaned,
        &config.match_number_key,
        &config.position_key,
        &config.operator_key,
    );
    let entries = reconcile::count_entries(&cleaned, &config.operator_key);

    let client = TbaClient::new(config.tba_api_key()?)?;
    let penalty_report = reconcile::score(
        &summary,
        &entries,
        &client,
        config.year,
        &config.event_key,
    );

    info!("Saving penalty reports to {}", config.penalties_path.display());
    store::save_document(&config.penalties_path, &penalty_report.counts)?;
    store::save_document(&config.penalties_relative_path, &penalty_report.records)?;

    info!(
        "Reconcile finished: {} operators scored, {} of {} matches skipped",
        penalty_report.records.len(),
        penalty_report.skipped_matches.len(),
        summary.matches.len(),
    );
    Ok(())
}
