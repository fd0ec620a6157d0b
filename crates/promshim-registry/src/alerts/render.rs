//! Rule expansion and the two output formats.

use std::fmt;

use promshim_core::error::{MetricsError, Result};
use promshim_core::{normalize, NormalizedName};
use serde::Serialize;

use super::schema::{AlertRule, AlertRulesFile, Pairs};

/// Prometheus rules file flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RulesFormat {
    /// 1.x `ALERT ... IF ... FOR ...` text.
    V1,
    /// 2.x YAML rule groups.
    #[default]
    V2,
}

/// One alert with placeholders expanded and labels/annotations assembled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedRule {
    pub alert: String,
    pub expr: String,
    #[serde(rename = "for")]
    pub duration: String,
    pub labels: Pairs,
    pub annotations: Pairs,
}

#[derive(Serialize)]
struct RulesDocument<'a> {
    groups: Vec<RuleGroup<'a>>,
}

#[derive(Serialize)]
struct RuleGroup<'a> {
    name: &'a str,
    rules: &'a [RenderedRule],
}

/// `$N` in an expression that does not point at a listed metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPlaceholder {
    pub placeholder: String,
    pub available: usize,
}

impl fmt::Display for UnknownPlaceholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} does not refer to one of the {} listed metrics",
            self.placeholder, self.available
        )
    }
}

impl std::error::Error for UnknownPlaceholder {}

/// Exported identifier a rule uses for `raw`.
///
/// The prefix is skipped when `raw` already starts with it, so rules may name
/// metrics either way.
pub fn metric_ref(raw: &str, prefix: Option<&NormalizedName>) -> NormalizedName {
    let name = normalize(raw);
    match prefix {
        Some(p) if !raw.starts_with(&format!("{p}_")) => name.prefixed(p),
        _ => name,
    }
}

/// Replace `$1`, `$2`, ... with the exported names of `metrics[0]`,
/// `metrics[1]`, ...
///
/// All digits after `$` form the index. A `$` without digits is kept as is.
pub fn expand_placeholders(
    expr: &str,
    metrics: &[String],
    prefix: Option<&NormalizedName>,
) -> std::result::Result<String, UnknownPlaceholder> {
    let mut out = String::with_capacity(expr.len());
    let mut rest = expr;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            out.push('$');
            rest = after;
            continue;
        }

        let unknown = || UnknownPlaceholder {
            placeholder: format!("${}", &after[..digits]),
            available: metrics.len(),
        };
        let raw = after[..digits]
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| metrics.get(i))
            .ok_or_else(unknown)?;

        out.push_str(&metric_ref(raw, prefix));
        rest = &after[digits..];
    }
    out.push_str(rest);
    Ok(out)
}

/// `severity` first, then the rule's extra labels.
pub fn labels(rule: &AlertRule) -> Pairs {
    let mut labels = Pairs::new();
    labels.insert_if_absent("severity", rule.severity.as_str());
    for (k, v) in rule.labels.iter() {
        labels.insert_if_absent(k, v);
    }
    labels
}

/// `summary`, `description`, `confluence_link`, then the rule's extras.
pub fn annotations(rule: &AlertRule, link_base: Option<&str>) -> Pairs {
    let mut anns = Pairs::new();
    anns.insert_if_absent("summary", rule.summary.as_str());
    anns.insert_if_absent("description", rule.description.as_str());

    if let Some(link) = &rule.confluence_link {
        let link = match link_base {
            Some(base) if link.starts_with('/') => {
                format!("{}{link}", base.trim_end_matches('/'))
            }
            _ => link.clone(),
        };
        anns.insert_if_absent("confluence_link", link);
    }

    for (k, v) in rule.annotations.iter() {
        anns.insert_if_absent(k, v);
    }
    anns
}

pub fn build(file: &AlertRulesFile) -> Result<Vec<RenderedRule>> {
    let prefix = file.prefix.as_deref().map(normalize);
    file.rules
        .iter()
        .map(|rule| {
            let expr = expand_placeholders(&rule.expr, &rule.metrics, prefix.as_ref())
                .map_err(|e| MetricsError::BadConfig(format!("rule {}: {e}", rule.name)))?;
            Ok(RenderedRule {
                alert: rule.name.clone(),
                expr,
                duration: rule.duration.clone(),
                labels: labels(rule),
                annotations: annotations(rule, file.link_base.as_deref()),
            })
        })
        .collect()
}

pub fn render(file: &AlertRulesFile, format: RulesFormat) -> Result<String> {
    let rules = build(file)?;
    tracing::debug!(group = %file.group, rules = rules.len(), ?format, "built alert rules");

    match format {
        RulesFormat::V1 => Ok(render_v1(&rules)),
        RulesFormat::V2 => {
            let doc = RulesDocument {
                groups: vec![RuleGroup {
                    name: &file.group,
                    rules: &rules,
                }],
            };
            serde_yaml::to_string(&doc).map_err(|e| MetricsError::Encode(e.to_string()))
        }
    }
}

fn render_v1(rules: &[RenderedRule]) -> String {
    rules
        .iter()
        .map(|r| {
            format!(
                "ALERT {}\n  IF {}\n  FOR {}\n  LABELS {{\n    {}\n  }}\n  ANNOTATIONS {{\n    {}\n  }}\n",
                r.alert,
                r.expr,
                r.duration,
                v1_block(&r.labels),
                v1_block(&r.annotations),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn v1_block(pairs: &Pairs) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k} = \"{}\"", v.replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(",\n    ")
}
