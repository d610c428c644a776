//! Fallback Sweep Task
//!
//! Background task that periodically purges expired fallback entries. Expired
//! entries are already invisible to readers; the sweep frees their memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheService;

/// Spawns a background task that purges expired fallback entries every
/// `interval_secs` seconds.
///
/// Returns the task handle so the entry point can abort it during shutdown.
pub fn spawn_sweep_task(cache: Arc<CacheService>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting fallback sweep task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.sweep_fallback().await;
            if removed > 0 {
                info!("Fallback sweep: removed {} expired entries", removed);
            } else {
                debug!("Fallback sweep: no expired entries found");
            }
        }
    })
}
