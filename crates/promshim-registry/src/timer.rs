//! Scoped timing.
//!
//! A [`TimerContext`] marks a start instant when created and observes the
//! elapsed wall-clock seconds on its target when it goes out of scope. Drop
//! also runs during unwinding and on early `?` returns, so the duration of a
//! failed operation is recorded too.

use std::time::Instant;

use crate::handles::Histogram;
use crate::summary::Summary;

enum Target {
    Histogram(Histogram),
    Summary(Summary),
}

impl Target {
    fn observe(&self, secs: f64) {
        match self {
            Target::Histogram(h) => {
                h.observe(secs);
            }
            Target::Summary(s) => {
                s.observe(secs);
            }
        }
    }
}

/// Guard returned by `time()` on histograms, timers and summaries.
///
/// Not meant to be shared across threads: acquire and release it within the
/// same unit of work.
#[must_use = "dropping the context right away records a near-zero duration"]
pub struct TimerContext {
    target: Option<Target>,
    start: Instant,
}

impl TimerContext {
    pub(crate) fn for_histogram(h: Histogram) -> Self {
        Self::start(Target::Histogram(h))
    }

    pub(crate) fn for_summary(s: Summary) -> Self {
        Self::start(Target::Summary(s))
    }

    fn start(target: Target) -> Self {
        Self {
            target: Some(target),
            start: Instant::now(),
        }
    }

    /// Seconds since the context was created.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Record now and return the observed seconds.
    pub fn observe_duration(mut self) -> f64 {
        self.record().unwrap_or_default()
    }

    /// Drop without recording anything.
    pub fn discard(mut self) {
        self.target = None;
    }

    fn record(&mut self) -> Option<f64> {
        let target = self.target.take()?;
        let secs = self.elapsed_secs();
        target.observe(secs);
        Some(secs)
    }
}

impl Drop for TimerContext {
    fn drop(&mut self) {
        self.record();
    }
}
