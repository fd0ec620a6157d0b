use std::fmt;

use promshim_core::error::{MetricsError, Result};
use promshim_core::normalize;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::render::expand_placeholders;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertRulesFile {
    pub version: u32,

    /// Rule group name in the 2.x format.
    pub group: String,

    /// Same meaning as the facade prefix: metrics in rule expressions are
    /// exported as `<prefix>_<name>`.
    #[serde(default)]
    pub prefix: Option<String>,

    /// Completes `confluence_link`s that start with `/`.
    #[serde(default)]
    pub link_base: Option<String>,

    #[serde(default)]
    pub rules: Vec<AlertRule>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertRule {
    pub name: String,

    /// Free-form metric names referenced as `$1`, `$2`, ... in `expr`.
    #[serde(default)]
    pub metrics: Vec<String>,

    pub expr: String,

    #[serde(rename = "for")]
    pub duration: String,

    #[serde(default)]
    pub severity: Severity,

    #[serde(default)]
    pub labels: Pairs,

    pub summary: String,
    pub description: String,

    #[serde(default)]
    pub confluence_link: Option<String>,

    #[serde(default)]
    pub annotations: Pairs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Page,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Page => "page",
            Severity::Warning => "warning",
        }
    }
}

impl AlertRulesFile {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetricsError::UnsupportedVersion(self.version));
        }
        if self.group.trim().is_empty() {
            return Err(MetricsError::BadConfig("group must not be blank".into()));
        }
        let prefix = self.prefix.as_deref().map(normalize);
        if prefix.as_ref().is_some_and(|p| p.is_empty()) {
            return Err(MetricsError::BadConfig("prefix must not be empty".into()));
        }

        for (i, rule) in self.rules.iter().enumerate() {
            for (field, value) in [
                ("name", &rule.name),
                ("expr", &rule.expr),
                ("for", &rule.duration),
            ] {
                if value.trim().is_empty() {
                    return Err(MetricsError::BadConfig(format!(
                        "rules[{i}].{field} must not be blank"
                    )));
                }
            }
            expand_placeholders(&rule.expr, &rule.metrics, prefix.as_ref()).map_err(|e| {
                MetricsError::BadConfig(format!("rules[{i}] ({}): {e}", rule.name))
            })?;
        }
        Ok(())
    }
}

/// String map that keeps entries in the order they were written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pairs(Vec<(String, String)>);

impl Pairs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Append `key = value` unless `key` is already present.
    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if self.get(&key).is_some() {
            return false;
        }
        self.0.push((key, value.into()));
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Pairs
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut out = Pairs::new();
        for (k, v) in iter {
            out.insert_if_absent(k, v);
        }
        out
    }
}

impl Serialize for Pairs {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct PairsVisitor;

impl<'de> Visitor<'de> for PairsVisitor {
    type Value = Pairs;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of strings")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut out = Pairs::new();
        while let Some((key, value)) = map.next_entry::<String, String>()? {
            if out.get(&key).is_some() {
                return Err(de::Error::custom(format!("duplicate key `{key}`")));
            }
            out.0.push((key, value));
        }
        Ok(out)
    }
}

impl<'de> Deserialize<'de> for Pairs {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(PairsVisitor)
    }
}
