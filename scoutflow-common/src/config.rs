//! Pipeline configuration
//!
//! All paths, key names, and policy flags live in one value threaded
//! explicitly into each stage. Resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `SCOUTFLOW_CONFIG` environment variable
//! 3. `./scoutflow.toml` when present
//! 4. Compiled defaults (the original data-folder layout)

use crate::error::{Error, Result};
use crate::validate::ValidationOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "SCOUTFLOW_CONFIG";

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "scoutflow.toml";

/// Environment variable fallback for the TBA API key.
pub const TBA_KEY_ENV_VAR: &str = "TBA_KEY";

/// Full pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Expected data structure document
    pub schema_path: PathBuf,
    /// Raw record batch
    pub raw_data_path: PathBuf,
    /// Cleaned record output
    pub cleaned_data_path: PathBuf,
    /// Voided entry log output
    pub voided_data_path: PathBuf,
    pub team_performance_json_path: PathBuf,
    pub team_performance_csv_path: PathBuf,
    /// Raw penalty counts output
    pub penalties_path: PathBuf,
    /// Penalty statistics output
    pub penalties_relative_path: PathBuf,

    /// Void a whole record on any missing/invalid declared field
    pub void_on_failure: bool,
    /// Metadata field naming the operator
    pub operator_key: String,
    /// Metadata field designating team identity
    pub team_key: String,
    /// Metadata field holding the match number
    pub match_number_key: String,
    /// Metadata field holding the robot position (alliance source)
    pub position_key: String,
    /// Top-level passthrough identifier field
    pub id_key: String,

    /// Competition year
    pub year: u16,
    /// TBA event key, e.g. `2025caph`
    pub event_key: String,
    /// TBA API key; falls back to the `TBA_KEY` environment variable
    pub tba_api_key: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            schema_path: "config/expected_data_structure.json".into(),
            raw_data_path: "data/raw/formatted_match_data.json".into(),
            cleaned_data_path: "data/processed/cleaned_match_data.json".into(),
            voided_data_path: "data/processed/voided_match_data.json".into(),
            team_performance_json_path: "outputs/team_data/team_performance_data.json".into(),
            team_performance_csv_path: "outputs/team_data/team_performance_data.csv".into(),
            penalties_path: "outputs/scouter_leaderboard/scouter_penalties.json".into(),
            penalties_relative_path: "outputs/scouter_leaderboard/scouter_penalties_relative.json"
                .into(),
            void_on_failure: true,
            operator_key: "scouterName".to_string(),
            team_key: "robotTeam".to_string(),
            match_number_key: "matchNumber".to_string(),
            position_key: "robotPosition".to_string(),
            id_key: "_id".to_string(),
            year: 2025,
            event_key: "2025caph".to_string(),
            tba_api_key: None,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<PipelineConfig> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Resolve the configuration following the priority order above.
    pub fn resolve(cli_arg: Option<&Path>) -> Result<PipelineConfig> {
        if let Some(path) = cli_arg {
            return Self::load(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::load(Path::new(&path));
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::load(default_path);
        }
        Ok(Self::default())
    }

    /// Record-validation policy slice of this configuration.
    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            void_on_failure: self.void_on_failure,
            operator_key: self.operator_key.clone(),
            id_key: self.id_key.clone(),
        }
    }

    /// TBA API key from the config file or the `TBA_KEY` environment
    /// variable; reconciliation cannot run without one.
    pub fn tba_api_key(&self) -> Result<String> {
        self.tba_api_key
            .clone()
            .or_else(|| std::env::var(TBA_KEY_ENV_VAR).ok())
            .ok_or_else(|| {
                Error::Config(format!(
                    "no TBA API key: set tba_api_key or the {TBA_KEY_ENV_VAR} environment variable"
                ))
            })
    }
}
