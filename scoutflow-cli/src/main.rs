//! scoutflow - batch validation and analysis pipeline for scouting records
//!
//! Stages:
//! - `clean`: validate raw records against the schema, void failures
//! - `aggregate`: per-team distributional statistics and custom metrics
//! - `reconcile`: operator reliability scored against The Blue Alliance
//! - `run`: all three in order

use anyhow::Result;
use clap::{Parser, Subcommand};
use scoutflow_common::config::PipelineConfig;
use std::path::PathBuf;
use tracing::info;

mod pipeline;

#[derive(Parser)]
#[command(name = "scoutflow", version, about = "Schema-driven scouting data pipeline")]
struct Cli {
    /// Configuration file (falls back to SCOUTFLOW_CONFIG, then ./scoutflow.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate raw records and write cleaned + voided documents
    Clean,
    /// Aggregate cleaned records into per-team performance reports
    Aggregate,
    /// Score operator data-entry reliability against the external source
    Reconcile,
    /// Run clean, aggregate, and reconcile in order
    Run,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting scoutflow v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = PipelineConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Command::Clean => pipeline::clean(&config)?,
        Command::Aggregate => pipeline::aggregate(&config)?,
        Command::Reconcile => pipeline::reconcile(&config)?,
        Command::Run => {
            pipeline::clean(&config)?;
            pipeline::aggregate(&config)?;
            pipeline::reconcile(&config)?;
        }
    }
    Ok(())
}
