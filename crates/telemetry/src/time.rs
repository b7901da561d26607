// Path: crates/telemetry/src/time.rs
use crate::sinks::RegistryMetricsSink;
use std::time::Instant;

/// Reports the lifetime of the guard as a block-connect latency on drop.
pub struct Timer<'a> {
    sink: &'a dyn RegistryMetricsSink,
    start: Instant,
}

impl<'a> Timer<'a> {
    pub fn new(sink: &'a dyn RegistryMetricsSink) -> Self {
        Self {
            sink,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.sink
            .observe_block_connect_duration(self.start.elapsed().as_secs_f64());
    }
}
