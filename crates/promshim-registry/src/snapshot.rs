//! Flat view of gathered metric families.
//!
//! Mirrors what a scraper would see: one [`Sample`] per exposed line, keyed
//! by sample name and ordered label names/values. Histograms expand into
//! cumulative `_bucket` samples (including `+Inf`), `_count` and `_sum`;
//! summaries into quantiles, `_count` and `_sum`.

use prometheus::proto::{Metric, MetricFamily, MetricType};

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub label_names: Vec<String>,
    pub label_values: Vec<String>,
    pub value: f64,
}

impl Sample {
    fn plain(name: impl Into<String>, metric: &Metric, value: f64) -> Self {
        let (label_names, label_values) = metric
            .get_label()
            .iter()
            .map(|l| (l.get_name().to_owned(), l.get_value().to_owned()))
            .unzip();
        Self {
            name: name.into(),
            label_names,
            label_values,
            value,
        }
    }

    fn with_label(
        name: String,
        metric: &Metric,
        label: &str,
        label_value: String,
        value: f64,
    ) -> Self {
        let mut s = Self::plain(name, metric, value);
        s.label_names.push(label.to_owned());
        s.label_values.push(label_value);
        s
    }

    /// Value of `label`, if present.
    pub fn label(&self, label: &str) -> Option<&str> {
        self.label_names
            .iter()
            .position(|n| n == label)
            .and_then(|i| self.label_values.get(i))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FamilySnapshot {
    pub name: String,
    pub help: String,
    pub metric_type: MetricType,
    pub samples: Vec<Sample>,
}

/// Expand gathered families into samples.
pub fn snapshot(families: &[MetricFamily]) -> Vec<FamilySnapshot> {
    families.iter().map(family_snapshot).collect()
}

/// First unlabelled sample called `name`, like a scraper lookup without a
/// label selector.
pub fn sample_value(families: &[FamilySnapshot], name: &str) -> Option<f64> {
    families
        .iter()
        .flat_map(|f| f.samples.iter())
        .find(|s| s.name == name && s.label_names.is_empty())
        .map(|s| s.value)
}

fn family_snapshot(mf: &MetricFamily) -> FamilySnapshot {
    let name = mf.get_name();
    let metric_type = mf.get_field_type();
    let mut samples = Vec::new();

    for m in mf.get_metric() {
        match metric_type {
            MetricType::COUNTER => {
                samples.push(Sample::plain(name, m, m.get_counter().get_value()))
            }
            MetricType::GAUGE => samples.push(Sample::plain(name, m, m.get_gauge().get_value())),
            MetricType::UNTYPED => {
                samples.push(Sample::plain(name, m, m.get_untyped().get_value()))
            }
            MetricType::HISTOGRAM => {
                let h = m.get_histogram();
                for b in h.get_bucket() {
                    samples.push(Sample::with_label(
                        format!("{name}_bucket"),
                        m,
                        "le",
                        format_bound(b.get_upper_bound()),
                        b.get_cumulative_count() as f64,
                    ));
                }
                samples.push(Sample::with_label(
                    format!("{name}_bucket"),
                    m,
                    "le",
                    "+Inf".to_owned(),
                    h.get_sample_count() as f64,
                ));
                let count = h.get_sample_count() as f64;
                samples.push(Sample::plain(format!("{name}_count"), m, count));
                samples.push(Sample::plain(format!("{name}_sum"), m, h.get_sample_sum()));
            }
            MetricType::SUMMARY => {
                let s = m.get_summary();
                for q in s.get_quantile() {
                    samples.push(Sample::with_label(
                        name.to_owned(),
                        m,
                        "quantile",
                        format_bound(q.get_quantile()),
                        q.get_value(),
                    ));
                }
                let count = s.get_sample_count() as f64;
                samples.push(Sample::plain(format!("{name}_count"), m, count));
                samples.push(Sample::plain(format!("{name}_sum"), m, s.get_sample_sum()));
            }
        }
    }

    FamilySnapshot {
        name: name.to_owned(),
        help: mf.get_help().to_owned(),
        metric_type,
        samples,
    }
}

fn format_bound(v: f64) -> String {
    match v {
        v if v.is_infinite() && v.is_sign_positive() => "+Inf".to_owned(),
        v if v.is_infinite() => "-Inf".to_owned(),
        v => v.to_string(),
    }
}
