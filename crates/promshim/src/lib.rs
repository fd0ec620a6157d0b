//! Top-level facade crate for promshim.
//!
//! Re-exports the naming core and the registry facade so users can depend on
//! a single crate.
//!
//! ```
//! let metrics = promshim::MetricsFacade::with_registry(prometheus::Registry::new());
//! metrics.gauge("queue.depth")?.inc_by(3.0);
//! assert_eq!(metrics.sample_value("queue_depth"), Some(3.0));
//! assert_eq!(promshim::normalize("queue.depth"), "queue_depth");
//! # Ok::<(), promshim::MetricsError>(())
//! ```

pub mod core {
    pub use promshim_core::*;
}

pub mod registry {
    pub use promshim_registry::*;
}

pub use promshim_core::{normalize, MetricsError, Result};
pub use promshim_registry::MetricsFacade;
