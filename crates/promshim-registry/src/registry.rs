//! Capability the facade needs from the external collector registry.

use prometheus::core::Collector;
use prometheus::proto::MetricFamily;

/// External registry seam.
///
/// The facade never stores samples itself; it registers collectors here and
/// reads them back through [`CollectorRegistry::gather`]. Duplicate names must
/// be rejected by the implementation, the facade's cache is the only thing
/// that keeps it from asking twice.
pub trait CollectorRegistry: Send + Sync {
    fn register(&self, collector: Box<dyn Collector>) -> prometheus::Result<()>;
    fn unregister(&self, collector: Box<dyn Collector>) -> prometheus::Result<()>;
    fn gather(&self) -> Vec<MetricFamily>;
}

impl CollectorRegistry for prometheus::Registry {
    fn register(&self, collector: Box<dyn Collector>) -> prometheus::Result<()> {
        prometheus::Registry::register(self, collector)
    }

    fn unregister(&self, collector: Box<dyn Collector>) -> prometheus::Result<()> {
        prometheus::Registry::unregister(self, collector)
    }

    fn gather(&self) -> Vec<MetricFamily> {
        prometheus::Registry::gather(self)
    }
}
