use std::collections::BTreeMap;

use promshim_core::error::{MetricsError, Result};
use promshim_core::normalize;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    pub version: u32,

    /// Prepended to every exported name as `<prefix>_`.
    #[serde(default)]
    pub prefix: Option<String>,

    /// Raw metric name -> help text, used when an accessor gives none.
    #[serde(default)]
    pub descriptions: BTreeMap<String, String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            version: 1,
            prefix: None,
            descriptions: BTreeMap::new(),
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetricsError::UnsupportedVersion(self.version));
        }
        if let Some(prefix) = &self.prefix {
            if normalize(prefix).is_empty() {
                return Err(MetricsError::BadConfig("prefix must not be empty".into()));
            }
        }
        if let Some((name, _)) = self.descriptions.iter().find(|(_, d)| d.trim().is_empty()) {
            return Err(MetricsError::BadConfig(format!(
                "descriptions.{name} must not be blank"
            )));
        }
        Ok(())
    }
}
