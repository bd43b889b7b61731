//! Common error types for Scoutflow

use crate::schema::SchemaFault;
use thiserror::Error;

/// Common result type for Scoutflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the pipeline stages
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse or serialize error (wraps serde_json::Error)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error from the external match lookup (wraps reqwest::Error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Schema document malformed; carries every fault found, not just the first
    #[error("Schema malformed: {}", format_faults(.0))]
    Schema(Vec<SchemaFault>),

    /// Invalid input document or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),
}

fn format_faults(faults: &[SchemaFault]) -> String {
    let listed = faults
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    format!("{} fault(s): {listed}", faults.len())
}
