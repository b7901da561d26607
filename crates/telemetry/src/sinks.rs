// Path: crates/telemetry/src/sinks.rs
//! Defines abstract traits for metrics reporting, decoupling core logic from the backend.

use once_cell::sync::OnceCell;

// --- Static Sink Access ---

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns a static reference to the configured registry metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn registry_metrics() -> &'static dyn RegistryMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured storage metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn storage_metrics() -> &'static dyn StorageMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured error metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

// --- Trait Definitions ---

/// A sink for metrics about registry versions and the version cache.
pub trait RegistryMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter of blocks connected to the registry.
    fn inc_blocks_connected(&self);
    /// Increments the counter of blocks undone.
    fn inc_blocks_undone(&self);
    /// Sets the participant gauges from the tip version.
    fn set_participants(&self, total: u64, valid: u64);
    /// Increments the counter of PoSe bans.
    fn inc_pose_bans(&self, count: u64);
    /// Increments the counter of version lookups served from the cache.
    fn inc_cache_hit(&self);
    /// Increments the counter of version lookups that had to be rebuilt.
    fn inc_cache_miss(&self);
    /// Sets the gauge for the number of cached registry versions.
    fn set_cached_lists(&self, count: u64);
    /// Observes the latency of connecting one block.
    fn observe_block_connect_duration(&self, duration_secs: f64);
}
impl RegistryMetricsSink for NopSink {
    fn inc_blocks_connected(&self) {}
    fn inc_blocks_undone(&self) {}
    fn set_participants(&self, _total: u64, _valid: u64) {}
    fn inc_pose_bans(&self, _count: u64) {}
    fn inc_cache_hit(&self) {}
    fn inc_cache_miss(&self) {}
    fn set_cached_lists(&self, _count: u64) {}
    fn observe_block_connect_duration(&self, _duration_secs: f64) {}
}

/// A sink for metrics related to the persistent storage layer.
pub trait StorageMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter of snapshots written.
    fn inc_snapshots_written(&self);
    /// Increments the counter of snapshot writes that failed.
    fn inc_snapshots_failed(&self);
    /// Increments the total number of bytes written to the storage backend.
    fn inc_bytes_written_total(&self, bytes: u64);
    /// Increments the total number of rows deleted by pruning and undo.
    fn inc_rows_deleted(&self, count: u64);
}
impl StorageMetricsSink for NopSink {
    fn inc_snapshots_written(&self) {}
    fn inc_snapshots_failed(&self) {}
    fn inc_bytes_written_total(&self, _bytes: u64) {}
    fn inc_rows_deleted(&self, _count: u64) {}
}

/// A sink for recording structured error metrics.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by its kind and variant.
    fn inc_error(&self, kind: &'static str, variant: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _kind: &'static str, _variant: &'static str) {}
}

/// A unified sink that implements all domain-specific traits, providing a single
/// point of implementation for metrics backends like Prometheus.
pub trait MetricsSink: RegistryMetricsSink + StorageMetricsSink + ErrorMetricsSink {}

// Blanket implementation to allow any type that implements all sub-traits
// to be used as a `MetricsSink`.
impl<T> MetricsSink for T where T: RegistryMetricsSink + StorageMetricsSink + ErrorMetricsSink {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nop_sink_accepts_every_report() {
        let sink: &dyn MetricsSink = &NopSink;
        sink.inc_blocks_connected();
        sink.set_participants(3, 2);
        sink.inc_bytes_written_total(10);
        sink.inc_error("registry", "REGISTRY_SNAPSHOT_IO");
        crate::time::Timer::new(sink);
    }
}
