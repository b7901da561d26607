// Path: crates/manager/src/maintenance.rs
use crate::manager::RegistryManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Spawns the periodic cache cleanup. The task stops when `shutdown`
/// changes or its sender is dropped.
pub fn spawn_maintenance(
    manager: Arc<RegistryManager>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_millis(manager.config().maintenance_interval_ms.max(1));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = manager.do_maintenance();
                    if evicted > 0 {
                        tracing::debug!(target: "cache", evicted, "maintenance pass");
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!(target: "cache", "maintenance task stopping");
                    break;
                }
            }
        }
    })
}
