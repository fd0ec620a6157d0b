//! End-to-end facade behaviour against an isolated registry per test.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::panic::{self, AssertUnwindSafe};

use prometheus::proto::MetricType;
use prometheus::{IntGauge, Registry};
use tracing_subscriber::EnvFilter;

use promshim_registry::{FamilySnapshot, Histogram, MetricsConfig, MetricsFacade};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn setup() -> (Registry, MetricsFacade) {
    init_tracing();
    let registry = Registry::new();
    let metrics = MetricsFacade::with_registry(registry.clone());
    (registry, metrics)
}

fn family<'a>(snap: &'a [FamilySnapshot], name: &str) -> &'a FamilySnapshot {
    snap.iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("family {name} missing"))
}

fn buckets(f: &FamilySnapshot) -> Vec<(String, f64)> {
    f.samples
        .iter()
        .filter(|s| s.name.ends_with("_bucket"))
        .map(|s| (s.label("le").unwrap().to_owned(), s.value))
        .collect()
}

fn parse_le(le: &str) -> f64 {
    if le == "+Inf" {
        f64::INFINITY
    } else {
        le.parse().unwrap()
    }
}

#[test]
fn counter_scenario() {
    let (_reg, metrics) = setup();
    let expected = 8_641_127_301.0;

    metrics.counter("counter_1").unwrap().inc_by(expected).unwrap();
    assert_eq!(metrics.sample_value("counter_1"), Some(expected));

    metrics.counter("counter_1").unwrap().inc();
    assert_eq!(metrics.sample_value("counter_1"), Some(expected + 1.0));
}

#[test]
fn gauge_scenario() {
    let (_reg, metrics) = setup();
    let expected = 5_550_123.0;
    assert_eq!(metrics.sample_value("g_1"), None);

    metrics.gauge("g_1").unwrap().inc_by(expected);
    assert_eq!(metrics.sample_value("g_1"), Some(expected));

    metrics.gauge("g_1").unwrap().inc();
    assert_eq!(metrics.sample_value("g_1"), Some(expected + 1.0));

    metrics.gauge("g_1").unwrap().dec();
    assert_eq!(metrics.sample_value("g_1"), Some(expected));

    metrics.gauge_with_help("g_1", "desc").unwrap().dec_by(1981.0);
    assert_eq!(metrics.sample_value("g_1"), Some(expected - 1981.0));
}

#[test]
fn summary_observations() {
    let (_reg, metrics) = setup();
    metrics
        .summary("Vals")
        .unwrap()
        .update(1212.213412)
        .observe(3434.34234)
        .observe(3.1415926535875);

    let snap = metrics.snapshot();
    let vals = family(&snap, "Vals");
    assert_eq!(vals.metric_type, MetricType::SUMMARY);
    assert_eq!(vals.help, "Vals");

    assert_eq!(metrics.sample_value("Vals_count"), Some(3.0));
    let sum = metrics.sample_value("Vals_sum").unwrap();
    assert!((sum - 4649.697344653588).abs() < 1e-9, "sum={sum}");
}

#[test]
fn summary_timers_accumulate() {
    let (_reg, metrics) = setup();
    {
        let _t = metrics.summary("Test_calc1").unwrap().time();
    }
    {
        let _t = metrics.summary("Test_calc1").unwrap().time();
    }

    assert_eq!(metrics.sample_value("Test_calc1_count"), Some(2.0));
    assert!(metrics.sample_value("Test_calc1_sum").unwrap() >= 0.0);
}

#[test]
fn histogram_large_value_only_hits_inf_bucket() {
    let (_reg, metrics) = setup();
    metrics.histogram("response-sizes").unwrap().update(34535.0);

    let snap = metrics.snapshot();
    let f = family(&snap, "response_sizes");
    assert_eq!(f.metric_type, MetricType::HISTOGRAM);
    assert_eq!(f.help, "response-sizes");

    let b = buckets(f);
    let (inf, finite): (Vec<_>, Vec<_>) = b.into_iter().partition(|(le, _)| le == "+Inf");
    assert!(!finite.is_empty());
    assert!(finite.iter().all(|(_, v)| *v == 0.0));
    assert_eq!(inf, vec![("+Inf".to_owned(), 1.0)]);

    assert_eq!(metrics.sample_value("response_sizes_count"), Some(1.0));
    assert_eq!(metrics.sample_value("response_sizes_sum"), Some(34535.0));
}

#[test]
fn histogram_observation_fills_every_bucket_at_or_above_it() {
    let (_reg, metrics) = setup();
    metrics.histogram("latency").unwrap().observe(0.3);

    let snap = metrics.snapshot();
    for (le, v) in buckets(family(&snap, "latency")) {
        let expected = if parse_le(&le) >= 0.3 { 1.0 } else { 0.0 };
        assert_eq!(v, expected, "le={le}");
    }
    assert_eq!(metrics.sample_value("latency_count"), Some(1.0));
    assert_eq!(metrics.sample_value("latency_sum"), Some(0.3));
}

fn timed_greeting(metrics: &MetricsFacade) -> &'static str {
    let _t = metrics.histogram("Test_calc1").unwrap().time();
    "Hi"
}

#[test]
fn scoped_timer_records_duration_into_histogram() {
    let (_reg, metrics) = setup();
    assert_eq!(timed_greeting(&metrics), "Hi");

    let snap = metrics.snapshot();
    let f = family(&snap, "Test_calc1");
    let observed = metrics.sample_value("Test_calc1_sum").unwrap();
    assert!(observed >= 0.0);
    for (le, v) in buckets(f) {
        if parse_le(&le) >= observed {
            assert_eq!(v, 1.0, "le={le}");
        }
    }
    assert_eq!(metrics.sample_value("Test_calc1_count"), Some(1.0));
}

#[test]
fn timer_uses_friendly_name_as_help() {
    let (_reg, metrics) = setup();
    {
        let _t = metrics.timer("Test.timer#a").unwrap().time();
    }

    let snap = metrics.snapshot();
    let f = family(&snap, "Test_timer_a");
    assert_eq!(f.metric_type, MetricType::HISTOGRAM);
    assert_eq!(f.help, "Test.timer#a");
    assert_eq!(metrics.sample_value("Test_timer_a_count"), Some(1.0));
}

#[test]
fn timer_records_when_block_panics() {
    let (_reg, metrics) = setup();
    let h = metrics.timer("panicky").unwrap();

    let res = panic::catch_unwind(AssertUnwindSafe(|| {
        let _t = h.time();
        panic!("boom");
    }));
    assert!(res.is_err());
    assert_eq!(h.count(), 1);
}

fn fetch_upstream() -> Result<u32, String> {
    Err("downstream unavailable".to_owned())
}

fn failing_op(h: &Histogram) -> Result<u32, String> {
    let _t = h.time();
    let v = fetch_upstream()?;
    Ok(v + 1)
}

#[test]
fn timer_records_on_early_error_return() {
    let (_reg, metrics) = setup();
    let h = metrics.timer("failing.op").unwrap();
    assert!(failing_op(&h).is_err());
    assert_eq!(metrics.sample_value("failing_op_count"), Some(1.0));
}

#[test]
fn timed_closure_observes_once() {
    let (_reg, metrics) = setup();
    let s = metrics.summary("closure").unwrap();
    let out = s.timed(|| 40 + 2);
    assert_eq!(out, 42);
    assert_eq!(s.count(), 1);
}

#[test]
fn separator_aliases_resolve_to_one_collector() {
    let (reg, metrics) = setup();
    let a = metrics.counter("audit.service").unwrap();
    let b = metrics.counter("audit-service").unwrap();
    let c = metrics.counter("audit_service").unwrap();
    a.inc();
    b.inc();
    c.inc();

    assert!(a.ptr_eq(&b) && b.ptr_eq(&c));
    assert_eq!(reg.gather().len(), 1);
    assert_eq!(metrics.sample_value("audit_service"), Some(3.0));
}

#[test]
fn exported_names_are_legal_identifiers() {
    let (reg, metrics) = setup();
    for raw in ["a.b.c", "x-y", "Mixed#Case", "with space", "tail."] {
        metrics.counter(raw).unwrap();
    }
    for mf in reg.gather() {
        assert!(
            mf.get_name().chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
            "{}",
            mf.get_name()
        );
    }
}

#[test]
fn cannot_reuse_name_for_another_kind() {
    let (reg, metrics) = setup();
    metrics.counter_with_help("xxx", "My first counter").unwrap();

    let err = metrics.gauge("xxx").err().expect("must fail");
    assert!(err.is_name_collision());
    assert_eq!(err.code().as_str(), "NAME_COLLISION");

    // The existing counter is untouched and still cached.
    assert_eq!(reg.gather().len(), 1);
    assert_eq!(metrics.cached(), 1);
    metrics.counter("xxx").unwrap().inc();
    assert_eq!(metrics.sample_value("xxx"), Some(1.0));
}

#[test]
fn collision_after_normalization_fails_at_first_use() {
    let (_reg, metrics) = setup();
    metrics.summary("jobs.done").unwrap();
    let err = metrics.counter("jobs-done").err().expect("must fail");
    assert!(err.is_name_collision());
}

#[test]
fn invalid_identifiers_surface_registry_errors() {
    let (reg, metrics) = setup();

    let empty = metrics.counter("").err().expect("empty name must fail");
    assert_eq!(empty.code().as_str(), "REGISTRY");

    let digit = metrics.gauge("9lives").err().expect("leading digit must fail");
    assert_eq!(digit.code().as_str(), "REGISTRY");

    assert!(reg.gather().is_empty());
    assert_eq!(metrics.cached(), 0);
}

#[test]
fn clear_resets_registry_and_cache() {
    let (_reg, metrics) = setup();
    assert!(metrics.snapshot().is_empty());

    metrics.counter("counter_1").unwrap().inc_by(1.0).unwrap();
    assert_eq!(metrics.sample_value("counter_1"), Some(1.0));

    metrics.clear().unwrap();
    assert!(metrics.snapshot().is_empty());
    assert_eq!(metrics.cached(), 0);

    metrics.counter("counter_1").unwrap().inc_by(21.0).unwrap();
    assert_eq!(metrics.sample_value("counter_1"), Some(21.0));

    metrics.clear().unwrap();
    assert!(metrics.snapshot().is_empty());
}

#[test]
fn custom_collectors_pass_through_and_survive_clear() {
    let (_reg, metrics) = setup();
    let open_fds = IntGauge::new("process_open_fds", "Open file descriptors").unwrap();
    open_fds.set(12);
    metrics
        .register_custom_collector(Box::new(open_fds.clone()))
        .unwrap();
    metrics.counter("requests").unwrap().inc();

    metrics.clear().unwrap();

    let snap = metrics.snapshot();
    assert_eq!(snap.len(), 1);
    assert_eq!(family(&snap, "process_open_fds").metric_type, MetricType::GAUGE);
    assert_eq!(metrics.sample_value("process_open_fds"), Some(12.0));
}

#[test]
fn prefixed_facade_from_config() {
    init_tracing();
    let cfg = promshim_registry::config::load_from_str(
        r#"
version: 1
prefix: "myapp"
descriptions:
  counter_1: "My first counter"
"#,
    )
    .unwrap();

    let registry = Registry::new();
    let metrics = MetricsFacade::from_config(registry, &cfg).unwrap();

    metrics.counter("counter_1").unwrap().inc_by(2.0).unwrap();
    metrics.summary("Vals").unwrap().observe(1.5);

    let snap = metrics.snapshot();
    assert_eq!(family(&snap, "myapp_counter_1").help, "My first counter");
    assert_eq!(family(&snap, "myapp_Vals").help, "Vals");
    assert_eq!(metrics.sample_value("myapp_counter_1"), Some(2.0));
    assert_eq!(metrics.sample_value("myapp_Vals_count"), Some(1.0));

    let text = metrics.render().unwrap();
    assert!(text.contains("# HELP myapp_counter_1 My first counter"), "{text}");
    assert!(text.contains("# TYPE myapp_Vals summary"), "{text}");
}

#[test]
fn default_config_matches_plain_facade() {
    let registry = Registry::new();
    let metrics = MetricsFacade::from_config(registry, &MetricsConfig::default()).unwrap();
    assert_eq!(metrics.exported_name("a.b"), "a_b");
}
