//! promshim core: metric name normalization, metric kinds, and the shared
//! error surface.
//!
//! This crate carries no registry wiring of its own so the naming rules can be
//! reused (and tested) independently of the facade that binds names to
//! collectors.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `MetricsError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod kind;
pub mod name;

/// Shared result type.
pub use error::{ErrorCode, MetricsError, Result};
pub use kind::MetricKind;
pub use name::{normalize, NormalizedName};
