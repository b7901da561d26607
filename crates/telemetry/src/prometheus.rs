// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the metrics sinks using the Prometheus crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_gauge, register_histogram, register_int_counter,
    register_int_counter_vec, Encoder, Gauge, Histogram, IntCounter, IntCounterVec, TextEncoder,
};

// --- Metric Statics ---
// Each collector is initialized exactly once by `install`.

static PARTICIPANTS_TOTAL: OnceCell<Gauge> = OnceCell::new();
static PARTICIPANTS_VALID: OnceCell<Gauge> = OnceCell::new();
static CACHED_LISTS: OnceCell<Gauge> = OnceCell::new();
static BLOCKS_CONNECTED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static BLOCKS_UNDONE_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static POSE_BANS_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static CACHE_HITS_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static CACHE_MISSES_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static SNAPSHOTS_WRITTEN_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static SNAPSHOTS_FAILED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static STORAGE_BYTES_WRITTEN_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static STORAGE_ROWS_DELETED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static BLOCK_CONNECT_DURATION_SECONDS: OnceCell<Histogram> = OnceCell::new();
static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

/// Runs `$body` with the collector bound to `$m`. Reports made before
/// `install()` are dropped.
macro_rules! with_metric {
    ($metric:ident, $m:ident => $body:expr) => {
        if let Some($m) = $metric.get() {
            $body;
        }
    };
}

impl RegistryMetricsSink for PrometheusSink {
    fn inc_blocks_connected(&self) {
        with_metric!(BLOCKS_CONNECTED_TOTAL, m => m.inc());
    }
    fn inc_blocks_undone(&self) {
        with_metric!(BLOCKS_UNDONE_TOTAL, m => m.inc());
    }
    fn set_participants(&self, total: u64, valid: u64) {
        with_metric!(PARTICIPANTS_TOTAL, m => m.set(total as f64));
        with_metric!(PARTICIPANTS_VALID, m => m.set(valid as f64));
    }
    fn inc_pose_bans(&self, count: u64) {
        with_metric!(POSE_BANS_TOTAL, m => m.inc_by(count));
    }
    fn inc_cache_hit(&self) {
        with_metric!(CACHE_HITS_TOTAL, m => m.inc());
    }
    fn inc_cache_miss(&self) {
        with_metric!(CACHE_MISSES_TOTAL, m => m.inc());
    }
    fn set_cached_lists(&self, count: u64) {
        with_metric!(CACHED_LISTS, m => m.set(count as f64));
    }
    fn observe_block_connect_duration(&self, duration_secs: f64) {
        with_metric!(BLOCK_CONNECT_DURATION_SECONDS, m => m.observe(duration_secs));
    }
}

impl StorageMetricsSink for PrometheusSink {
    fn inc_snapshots_written(&self) {
        with_metric!(SNAPSHOTS_WRITTEN_TOTAL, m => m.inc());
    }
    fn inc_snapshots_failed(&self) {
        with_metric!(SNAPSHOTS_FAILED_TOTAL, m => m.inc());
    }
    fn inc_bytes_written_total(&self, bytes: u64) {
        with_metric!(STORAGE_BYTES_WRITTEN_TOTAL, m => m.inc_by(bytes));
    }
    fn inc_rows_deleted(&self, count: u64) {
        with_metric!(STORAGE_ROWS_DELETED_TOTAL, m => m.inc_by(count));
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, kind: &'static str, variant: &'static str) {
        with_metric!(ERRORS_TOTAL, m => m.with_label_values(&[kind, variant]).inc());
    }
}

fn set_once<T>(cell: &OnceCell<T>, value: T) -> Result<(), prometheus::Error> {
    cell.set(value).map_err(|_| prometheus::Error::AlreadyReg)
}

/// Initializes all Prometheus metrics collectors and returns a static reference to the sink.
/// A second call fails with `AlreadyReg`.
pub fn install() -> Result<&'static dyn MetricsSink, prometheus::Error> {
    set_once(
        &PARTICIPANTS_TOTAL,
        register_gauge!(
            "mnlist_participants_total",
            "Participants in the tip registry version."
        )?,
    )?;
    set_once(
        &PARTICIPANTS_VALID,
        register_gauge!(
            "mnlist_participants_valid",
            "Participants in the tip registry version that are not PoSe-banned."
        )?,
    )?;
    set_once(
        &CACHED_LISTS,
        register_gauge!(
            "mnlist_cached_lists",
            "Registry versions currently held in the cache."
        )?,
    )?;
    set_once(
        &BLOCKS_CONNECTED_TOTAL,
        register_int_counter!(
            "mnlist_blocks_connected_total",
            "Total blocks connected to the registry."
        )?,
    )?;
    set_once(
        &BLOCKS_UNDONE_TOTAL,
        register_int_counter!("mnlist_blocks_undone_total", "Total blocks undone.")?,
    )?;
    set_once(
        &POSE_BANS_TOTAL,
        register_int_counter!("mnlist_pose_bans_total", "Total PoSe bans observed at the tip.")?,
    )?;
    set_once(
        &CACHE_HITS_TOTAL,
        register_int_counter!(
            "mnlist_cache_hits_total",
            "Registry version lookups served from the cache."
        )?,
    )?;
    set_once(
        &CACHE_MISSES_TOTAL,
        register_int_counter!(
            "mnlist_cache_misses_total",
            "Registry version lookups rebuilt from snapshots and diffs."
        )?,
    )?;
    set_once(
        &SNAPSHOTS_WRITTEN_TOTAL,
        register_int_counter!("mnlist_snapshots_written_total", "Total snapshots written.")?,
    )?;
    set_once(
        &SNAPSHOTS_FAILED_TOTAL,
        register_int_counter!(
            "mnlist_snapshots_failed_total",
            "Total snapshot writes that failed."
        )?,
    )?;
    set_once(
        &STORAGE_BYTES_WRITTEN_TOTAL,
        register_int_counter!(
            "mnlist_storage_bytes_written_total",
            "Total bytes written to the storage backend."
        )?,
    )?;
    set_once(
        &STORAGE_ROWS_DELETED_TOTAL,
        register_int_counter!(
            "mnlist_storage_rows_deleted_total",
            "Total rows deleted by pruning and undo."
        )?,
    )?;
    set_once(
        &BLOCK_CONNECT_DURATION_SECONDS,
        register_histogram!(
            "mnlist_block_connect_duration_seconds",
            "Latency of connecting one block to the registry.",
            exponential_buckets(0.0001, 2.0, 16)?
        )?,
    )?;
    set_once(
        &ERRORS_TOTAL,
        register_int_counter_vec!(
            "mnlist_errors_total",
            "Total number of errors, categorized by type and variant.",
            &["kind", "variant"]
        )?,
    )?;

    static SINK: PrometheusSink = PrometheusSink;
    Ok(&SINK)
}

/// Installs the collectors and publishes the sink through the global accessors.
pub fn install_global() -> Result<(), prometheus::Error> {
    let sink = install()?;
    set_once(&crate::sinks::SINK, sink)
}

/// Renders every registered metric in the Prometheus text format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::error!(error = %e, "Failed to encode prometheus metrics");
    }
    String::from_utf8_lossy(&buf).into_owned()
}
