//! Whole-document store
//!
//! Schema, raw, and output documents are read-once/write-once per run:
//! every load and save moves a complete document, with the file path folded
//! into any error so failures are reproducible from the log alone.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load one JSON document.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::NotFound(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| Error::InvalidInput(format!("{}: {e}", path.display())))
}

/// Save one JSON document (pretty-printed), creating parent directories.
pub fn save_document<T: Serialize>(path: &Path, document: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(document)?;
    save_text(path, &text)
}

/// Save a plain-text document (CSV reports), creating parent directories.
pub fn save_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("cannot create {}: {e}", parent.display())))?;
    }
    fs::write(path, text).map_err(|e| Error::Config(format!("cannot write {}: {e}", path.display())))
}
