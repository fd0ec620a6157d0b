//! Summary collector (count + sum, no quantiles).
//!
//! The registry crate only ships counters, gauges and histograms, so summaries
//! are exported through a hand-written [`Collector`] that emits a `SUMMARY`
//! family with `_count` and `_sum`.
//!
//! Count and sum live behind one lock so a scrape never sees an observation
//! half applied.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use prometheus::core::{Collector, Desc};
use prometheus::proto::{self, MetricFamily, MetricType};
use promshim_core::NormalizedName;

use crate::timer::TimerContext;

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    count: u64,
    sum: f64,
}

struct SummaryCore {
    name: NormalizedName,
    desc: Desc,
    totals: Mutex<Totals>,
}

impl SummaryCore {
    // Totals are two plain numbers updated without panicking, so a poisoned
    // lock still guards a consistent pair.
    fn totals(&self) -> MutexGuard<'_, Totals> {
        self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Running count and sum of observations.
#[derive(Clone)]
pub struct Summary {
    inner: Arc<SummaryCore>,
}

impl Summary {
    pub(crate) fn create(name: &NormalizedName, help: &str) -> prometheus::Result<Self> {
        let desc = Desc::new(name.to_string(), help.to_owned(), Vec::new(), HashMap::new())?;
        Ok(Self {
            inner: Arc::new(SummaryCore {
                name: name.clone(),
                desc,
                totals: Mutex::new(Totals::default()),
            }),
        })
    }

    pub(crate) fn collector(&self) -> Box<dyn Collector> {
        Box::new(self.clone())
    }

    /// Record one observation.
    pub fn observe(&self, value: f64) -> &Self {
        let mut totals = self.inner.totals();
        totals.count += 1;
        totals.sum += value;
        drop(totals);
        self
    }

    /// Dropwizard-style alias for [`Summary::observe`].
    pub fn update(&self, value: f64) -> &Self {
        self.observe(value)
    }

    /// Start a scoped timing; see [`TimerContext`].
    pub fn time(&self) -> TimerContext {
        TimerContext::for_summary(self.clone())
    }

    pub fn timed<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _ctx = self.time();
        f()
    }

    pub fn count(&self) -> u64 {
        self.inner.totals().count
    }

    pub fn sum(&self) -> f64 {
        self.inner.totals().sum
    }

    pub fn name(&self) -> &str {
        self.inner.name.as_str()
    }

    pub fn help(&self) -> &str {
        &self.inner.desc.help
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Collector for Summary {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.inner.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let totals = *self.inner.totals();
        let mut summary = proto::Summary::default();
        summary.set_sample_count(totals.count);
        summary.set_sample_sum(totals.sum);

        let mut metric = proto::Metric::default();
        metric.set_summary(summary);

        let mut family = MetricFamily::default();
        family.set_name(self.inner.desc.fq_name.clone());
        family.set_help(self.inner.desc.help.clone());
        family.set_field_type(MetricType::SUMMARY);
        family.mut_metric().push(metric);
        vec![family]
    }
}
