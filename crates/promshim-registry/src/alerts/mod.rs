//! Alert rules generator.
//!
//! Rule expressions name metrics by the same free-form names the facade
//! accepts (`$1`, `$2`, ... point into the rule's `metrics` list); the
//! generator rewrites them to exported identifiers and emits a Prometheus
//! rules file.

pub mod render;
pub mod schema;

use std::fs;
use std::path::Path;

use promshim_core::error::{MetricsError, Result};

pub use render::{
    build, expand_placeholders, metric_ref, render, RenderedRule, RulesFormat,
    UnknownPlaceholder,
};
pub use schema::{AlertRule, AlertRulesFile, Pairs, Severity};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<AlertRulesFile> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)
        .map_err(|e| MetricsError::BadConfig(format!("read {} failed: {e}", path.display())))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<AlertRulesFile> {
    let file: AlertRulesFile = serde_yaml::from_str(s)
        .map_err(|e| MetricsError::BadConfig(format!("invalid yaml: {e}")))?;
    file.validate()?;
    Ok(file)
}
