//! Metric registry facade.
//!
//! Accessors take free-form names, normalize them, and get-or-create one
//! collector per (kind, exported name) against the injected registry:
//! - a cache hit returns the same handle, the registry is not touched
//! - a miss builds the collector, registers it, and caches it while the
//!   cache shard is still locked, so concurrent first use registers once
//! - registry failures (duplicate name across kinds, invalid identifier)
//!   propagate untouched and leave the cache as it was

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use prometheus::core::Collector;
use prometheus::{Encoder, TextEncoder};
use promshim_core::error::{MetricsError, Result};
use promshim_core::{normalize, MetricKind, NormalizedName};

use crate::config::MetricsConfig;
use crate::handles::{Counter, Gauge, Histogram};
use crate::registry::CollectorRegistry;
use crate::snapshot::{self, FamilySnapshot};
use crate::summary::Summary;

/// Per-kind caches keyed by exported name.
#[derive(Default)]
struct Families {
    counters: DashMap<NormalizedName, Counter>,
    gauges: DashMap<NormalizedName, Gauge>,
    histograms: DashMap<NormalizedName, Histogram>,
    summaries: DashMap<NormalizedName, Summary>,
}

impl Families {
    fn len(&self) -> usize {
        self.counters.len() + self.gauges.len() + self.histograms.len() + self.summaries.len()
    }

    /// Empty every cache and hand back the collectors that were in it.
    fn drain(&self) -> Vec<Box<dyn Collector>> {
        let mut out = Vec::with_capacity(self.len());
        out.extend(drain_family::<Counter>(self));
        out.extend(drain_family::<Gauge>(self));
        out.extend(drain_family::<Histogram>(self));
        out.extend(drain_family::<Summary>(self));
        out
    }
}

fn drain_family<T: Instrument>(families: &Families) -> Vec<Box<dyn Collector>> {
    let map = T::family(families);
    let keys: Vec<NormalizedName> = map.iter().map(|e| e.key().clone()).collect();
    keys.into_iter()
        .filter_map(|k| map.remove(&k))
        .map(|(_, m)| m.collector())
        .collect()
}

/// What the facade needs from each handle type.
trait Instrument: Clone + Send + Sync + 'static {
    const KIND: MetricKind;

    fn create(name: &NormalizedName, help: &str) -> prometheus::Result<Self>;
    fn collector(&self) -> Box<dyn Collector>;
    fn family(families: &Families) -> &DashMap<NormalizedName, Self>;
}

impl Instrument for Counter {
    const KIND: MetricKind = MetricKind::Counter;

    fn create(name: &NormalizedName, help: &str) -> prometheus::Result<Self> {
        Counter::create(name, help)
    }
    fn collector(&self) -> Box<dyn Collector> {
        Counter::collector(self)
    }
    fn family(families: &Families) -> &DashMap<NormalizedName, Self> {
        &families.counters
    }
}

impl Instrument for Gauge {
    const KIND: MetricKind = MetricKind::Gauge;

    fn create(name: &NormalizedName, help: &str) -> prometheus::Result<Self> {
        Gauge::create(name, help)
    }
    fn collector(&self) -> Box<dyn Collector> {
        Gauge::collector(self)
    }
    fn family(families: &Families) -> &DashMap<NormalizedName, Self> {
        &families.gauges
    }
}

impl Instrument for Histogram {
    const KIND: MetricKind = MetricKind::Histogram;

    fn create(name: &NormalizedName, help: &str) -> prometheus::Result<Self> {
        Histogram::create(name, help)
    }
    fn collector(&self) -> Box<dyn Collector> {
        Histogram::collector(self)
    }
    fn family(families: &Families) -> &DashMap<NormalizedName, Self> {
        &families.histograms
    }
}

impl Instrument for Summary {
    const KIND: MetricKind = MetricKind::Summary;

    fn create(name: &NormalizedName, help: &str) -> prometheus::Result<Self> {
        Summary::create(name, help)
    }
    fn collector(&self) -> Box<dyn Collector> {
        Summary::collector(self)
    }
    fn family(families: &Families) -> &DashMap<NormalizedName, Self> {
        &families.summaries
    }
}

/// Timer/counter/gauge-style front end over a collector registry.
///
/// # Examples
///
/// ```
/// use promshim_registry::MetricsFacade;
///
/// let registry = prometheus::Registry::new();
/// let metrics = MetricsFacade::with_registry(registry.clone());
///
/// metrics.counter("audit.service")?.inc();
/// {
///     let _t = metrics.timer("audit.latency")?.time();
/// }
///
/// // Separators are folded, so this is the same counter.
/// assert_eq!(metrics.counter("audit_service")?.get(), 1.0);
/// assert_eq!(metrics.sample_value("audit_latency_count"), Some(1.0));
/// # Ok::<(), promshim_core::MetricsError>(())
/// ```
pub struct MetricsFacade {
    registry: Arc<dyn CollectorRegistry>,
    families: Families,
    prefix: Option<NormalizedName>,
    descriptions: BTreeMap<String, String>,
}

impl MetricsFacade {
    /// Facade bound to the process-wide default registry.
    pub fn new() -> Self {
        Self::with_registry(prometheus::default_registry().clone())
    }

    /// Facade bound to `registry`. Tests use this to start from an empty,
    /// isolated registry.
    pub fn with_registry<R>(registry: R) -> Self
    where
        R: CollectorRegistry + 'static,
    {
        Self::with_shared_registry(Arc::new(registry))
    }

    pub fn with_shared_registry(registry: Arc<dyn CollectorRegistry>) -> Self {
        Self {
            registry,
            families: Families::default(),
            prefix: None,
            descriptions: BTreeMap::new(),
        }
    }

    /// Facade bound to `registry`, with the prefix and description mappings
    /// from `cfg`.
    pub fn from_config<R>(registry: R, cfg: &MetricsConfig) -> Result<Self>
    where
        R: CollectorRegistry + 'static,
    {
        cfg.validate()?;
        let mut facade = Self::with_registry(registry);
        facade.prefix = cfg.prefix.as_deref().map(normalize);
        facade.descriptions = cfg.descriptions.clone();
        Ok(facade)
    }

    /// Swap the registry. Cached handles belong to the old registry and are
    /// dropped (not unregistered).
    pub fn set_registry<R>(&mut self, registry: R)
    where
        R: CollectorRegistry + 'static,
    {
        self.registry = Arc::new(registry);
        self.families = Families::default();
    }

    /// Counter under `normalize(name)`; help text defaults to `name`.
    pub fn counter(&self, name: &str) -> Result<Counter> {
        self.get_or_add(name, None)
    }

    pub fn counter_with_help(&self, name: &str, help: &str) -> Result<Counter> {
        self.get_or_add(name, Some(help))
    }

    pub fn gauge(&self, name: &str) -> Result<Gauge> {
        self.get_or_add(name, None)
    }

    pub fn gauge_with_help(&self, name: &str, help: &str) -> Result<Gauge> {
        self.get_or_add(name, Some(help))
    }

    pub fn histogram(&self, name: &str) -> Result<Histogram> {
        self.get_or_add(name, None)
    }

    pub fn histogram_with_help(&self, name: &str, help: &str) -> Result<Histogram> {
        self.get_or_add(name, Some(help))
    }

    /// Histogram used for durations. `timer("x")` and `histogram("x")` are
    /// the same collector.
    pub fn timer(&self, name: &str) -> Result<Histogram> {
        self.histogram(name)
    }

    pub fn timer_with_help(&self, name: &str, help: &str) -> Result<Histogram> {
        self.histogram_with_help(name, help)
    }

    pub fn summary(&self, name: &str) -> Result<Summary> {
        self.get_or_add(name, None)
    }

    pub fn summary_with_help(&self, name: &str, help: &str) -> Result<Summary> {
        self.get_or_add(name, Some(help))
    }

    /// Register a collector the facade does not manage (process stats and
    /// the like). It is not cached and survives [`MetricsFacade::clear`].
    pub fn register_custom_collector(&self, collector: Box<dyn Collector>) -> Result<()> {
        self.registry.register(collector)?;
        Ok(())
    }

    /// Unregister every collector this facade created and empty the cache.
    /// Requesting the same names afterwards starts from fresh state.
    ///
    /// Every cached collector is unregistered even when one of them fails
    /// (e.g. it was already unregistered by someone else); the first failure
    /// is returned once the rest are done.
    pub fn clear(&self) -> Result<()> {
        let drained = self.families.drain();
        tracing::debug!(count = drained.len(), "clearing facade metrics");

        let mut first_err = None;
        for collector in drained {
            if let Err(e) = self.registry.unregister(collector) {
                tracing::warn!(error = %e, "unregister failed during clear");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Exported identifier for `name` under this facade's prefix.
    pub fn exported_name(&self, name: &str) -> NormalizedName {
        let base = normalize(name);
        match &self.prefix {
            Some(prefix) => base.prefixed(prefix),
            None => base,
        }
    }

    /// Number of cached handles across all kinds.
    pub fn cached(&self) -> usize {
        self.families.len()
    }

    pub fn snapshot(&self) -> Vec<FamilySnapshot> {
        snapshot::snapshot(&self.registry.gather())
    }

    /// Current value of the unlabelled sample called `sample_name`
    /// (an exported name, e.g. `myapp_requests` or `latency_count`).
    pub fn sample_value(&self, sample_name: &str) -> Option<f64> {
        snapshot::sample_value(&self.snapshot(), sample_name)
    }

    /// Registry contents in the text exposition format.
    pub fn render(&self) -> Result<String> {
        let families = self.registry.gather();
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buf)
            .map_err(|e| MetricsError::Encode(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| MetricsError::Encode(e.to_string()))
    }

    fn get_or_add<T: Instrument>(&self, name: &str, help: Option<&str>) -> Result<T> {
        let exported = self.exported_name(name);
        let kind = T::KIND;

        match T::family(&self.families).entry(exported) {
            Entry::Occupied(e) => Ok(e.get().clone()),
            Entry::Vacant(slot) => {
                let help = self.describe(name, help);
                let metric = T::create(slot.key(), help)?;
                if let Err(e) = self.registry.register(metric.collector()) {
                    tracing::warn!(
                        kind = %kind,
                        metric = %slot.key(),
                        error = %e,
                        "registry rejected collector"
                    );
                    return Err(e.into());
                }
                tracing::debug!(kind = %kind, metric = %slot.key(), "registered collector");
                Ok(slot.insert(metric).value().clone())
            }
        }
    }

    /// Explicit help, else configured mapping for the raw name, else the raw
    /// name itself.
    fn describe<'a>(&'a self, name: &'a str, help: Option<&'a str>) -> &'a str {
        help.or_else(|| self.descriptions.get(name).map(String::as_str))
            .unwrap_or(name)
    }
}

impl Default for MetricsFacade {
    fn default() -> Self {
        Self::new()
    }
}
