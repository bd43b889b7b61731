//! # Scoutflow Common Library
//!
//! Schema-driven validation and analysis engine for competition scouting
//! records:
//! - Schema model (expected data structure, statistical types)
//! - Flattening engine (nested variable trees to dotted-path keys)
//! - Value and record validators (void-on-any-failure policy)
//! - Team aggregator with a pluggable metric registry
//! - Reconciliation scorer against an external match-results source
//! - Document store and report rendering

pub mod aggregate;
pub mod config;
pub mod error;
pub mod flatten;
pub mod metrics;
pub mod reconcile;
pub mod report;
pub mod schema;
pub mod stats;
pub mod store;
pub mod tba;
pub mod validate;

pub use error::{Error, Result};
pub use schema::{Schema, SchemaLeaf, SchemaNode, StatType};
pub use validate::{RecordValidator, ValidatedRecord, ValidationOptions, VoidedEntry};
