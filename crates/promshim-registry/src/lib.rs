//! promshim registry: binds normalized names to collectors.
//!
//! [`MetricsFacade`] hands out counter, gauge, histogram/timer and summary
//! handles by free-form name, caching one collector per kind and exported
//! name against an injected [`CollectorRegistry`]. Everything about storing
//! and rendering samples stays with the registry.
//!
//! [`alerts`] turns a YAML rules file whose expressions use the same
//! free-form names into a Prometheus alert rules file.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod alerts;
pub mod config;
pub mod facade;
pub mod handles;
pub mod registry;
pub mod snapshot;
pub mod summary;
pub mod timer;

pub use alerts::{AlertRulesFile, RulesFormat};
pub use config::MetricsConfig;
pub use facade::MetricsFacade;
pub use handles::{Counter, Gauge, Histogram};
pub use registry::CollectorRegistry;
pub use snapshot::{FamilySnapshot, Sample};
pub use summary::Summary;
pub use timer::TimerContext;
