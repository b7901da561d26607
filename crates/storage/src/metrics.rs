// Path: crates/storage/src/metrics.rs
use mnlist_api::storage::WriteOp;
use mnlist_telemetry::sinks::StorageMetricsSink;
use once_cell::sync::OnceCell;

/// A storage-only override of the global sink, for embedders that report
/// storage metrics separately.
pub static SINK: OnceCell<&'static dyn StorageMetricsSink> = OnceCell::new();

pub fn metrics() -> &'static dyn StorageMetricsSink {
    SINK.get()
        .copied()
        .unwrap_or_else(mnlist_telemetry::storage_metrics)
}

/// Reports the volume of a committed batch.
pub(crate) fn record_batch(ops: &[WriteOp]) {
    let mut bytes = 0u64;
    let mut deleted = 0u64;
    for op in ops {
        match op {
            WriteOp::Put(k, v) => bytes += (k.len() + v.len()) as u64,
            WriteOp::Delete(_) => deleted += 1,
        }
    }
    if bytes > 0 {
        metrics().inc_bytes_written_total(bytes);
    }
    if deleted > 0 {
        metrics().inc_rows_deleted(deleted);
    }
}
