//! Typed handles returned by the facade accessors.
//!
//! Each handle is a cheap `Arc` clone around a collector owned by the
//! external registry. Two handles obtained for the same exported name compare
//! equal under `ptr_eq`.

use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{HistogramOpts, Opts};
use promshim_core::error::{MetricsError, Result};
use promshim_core::NormalizedName;

use crate::timer::TimerContext;

pub(crate) struct Instrumented<M> {
    pub(crate) name: NormalizedName,
    pub(crate) help: String,
    pub(crate) metric: M,
}

impl<M> Instrumented<M> {
    pub(crate) fn new(name: &NormalizedName, help: &str, metric: M) -> Arc<Self> {
        Arc::new(Self {
            name: name.clone(),
            help: help.to_owned(),
            metric,
        })
    }
}

/// Monotonic counter.
#[derive(Clone)]
pub struct Counter {
    inner: Arc<Instrumented<prometheus::Counter>>,
}

impl Counter {
    pub(crate) fn create(name: &NormalizedName, help: &str) -> prometheus::Result<Self> {
        let metric = prometheus::Counter::with_opts(Opts::new(name.as_str(), help))?;
        Ok(Self {
            inner: Instrumented::new(name, help, metric),
        })
    }

    pub(crate) fn collector(&self) -> Box<dyn Collector> {
        Box::new(self.inner.metric.clone())
    }

    /// Increment by 1.
    pub fn inc(&self) {
        self.inner.metric.inc();
    }

    /// Increment by `amount`.
    ///
    /// Counters only go up: a negative or NaN amount is rejected with
    /// [`MetricsError::NegativeIncrement`] and the value is left unchanged.
    pub fn inc_by(&self, amount: f64) -> Result<()> {
        if amount.is_nan() || amount < 0.0 {
            tracing::warn!(
                metric = %self.inner.name,
                amount,
                "rejected negative counter increment"
            );
            return Err(MetricsError::NegativeIncrement {
                metric: self.inner.name.to_string(),
                amount,
            });
        }
        self.inner.metric.inc_by(amount);
        Ok(())
    }

    pub fn get(&self) -> f64 {
        self.inner.metric.get()
    }

    /// Exported identifier.
    pub fn name(&self) -> &str {
        self.inner.name.as_str()
    }

    pub fn help(&self) -> &str {
        &self.inner.help
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Value that can go up and down.
#[derive(Clone)]
pub struct Gauge {
    inner: Arc<Instrumented<prometheus::Gauge>>,
}

impl Gauge {
    pub(crate) fn create(name: &NormalizedName, help: &str) -> prometheus::Result<Self> {
        let metric = prometheus::Gauge::with_opts(Opts::new(name.as_str(), help))?;
        Ok(Self {
            inner: Instrumented::new(name, help, metric),
        })
    }

    pub(crate) fn collector(&self) -> Box<dyn Collector> {
        Box::new(self.inner.metric.clone())
    }

    pub fn inc(&self) {
        self.inner.metric.inc();
    }

    pub fn inc_by(&self, amount: f64) {
        self.inner.metric.add(amount);
    }

    pub fn dec(&self) {
        self.inner.metric.dec();
    }

    pub fn dec_by(&self, amount: f64) {
        self.inner.metric.sub(amount);
    }

    pub fn get(&self) -> f64 {
        self.inner.metric.get()
    }

    pub fn name(&self) -> &str {
        self.inner.name.as_str()
    }

    pub fn help(&self) -> &str {
        &self.inner.help
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Bucketed distribution; also what `timer` accessors hand out.
///
/// Uses the registry crate's default buckets (5ms .. 10s), which suits
/// durations in seconds.
#[derive(Clone)]
pub struct Histogram {
    inner: Arc<Instrumented<prometheus::Histogram>>,
}

impl Histogram {
    pub(crate) fn create(name: &NormalizedName, help: &str) -> prometheus::Result<Self> {
        let metric = prometheus::Histogram::with_opts(HistogramOpts::new(name.as_str(), help))?;
        Ok(Self {
            inner: Instrumented::new(name, help, metric),
        })
    }

    pub(crate) fn collector(&self) -> Box<dyn Collector> {
        Box::new(self.inner.metric.clone())
    }

    /// Record one observation.
    pub fn observe(&self, value: f64) -> &Self {
        self.inner.metric.observe(value);
        self
    }

    /// Dropwizard-style alias for [`Histogram::observe`].
    pub fn update(&self, value: f64) -> &Self {
        self.observe(value)
    }

    /// Start a scoped timing. The elapsed seconds are observed when the
    /// returned context is dropped.
    pub fn time(&self) -> TimerContext {
        TimerContext::for_histogram(self.clone())
    }

    /// Run `f` and observe how long it took.
    pub fn timed<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _ctx = self.time();
        f()
    }

    pub fn count(&self) -> u64 {
        self.inner.metric.get_sample_count()
    }

    pub fn sum(&self) -> f64 {
        self.inner.metric.get_sample_sum()
    }

    pub fn name(&self) -> &str {
        self.inner.name.as_str()
    }

    pub fn help(&self) -> &str {
        &self.inner.help
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
