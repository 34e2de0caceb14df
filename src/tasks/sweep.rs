//! Sweep Task
//!
//! Background task that periodically runs [`MemoryCache::sweep`].

use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{MemoryCache, MIN_SWEEP_INTERVAL};

/// Handle to a running sweep task.
#[derive(Debug)]
pub struct SweepTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl SweepTask {
    /// Signals the task to stop without waiting for it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Signals the task to stop and waits for it to exit.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            if !e.is_cancelled() {
                warn!("Sweep task ended abnormally: {}", e);
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawns a background task that sweeps `cache` every `interval`.
///
/// The task exits when cancelled or once the cache has been dropped. Returns
/// `None` when called outside a Tokio runtime. `interval` is raised to
/// [`MIN_SWEEP_INTERVAL`] if shorter.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(MemoryCache::new(MemoryConfig::default()));
/// let task = spawn_sweep_task(Arc::downgrade(&cache), Duration::from_secs(30)).unwrap();
/// // Later, during shutdown:
/// task.stop().await;
/// ```
pub fn spawn_sweep_task(cache: Weak<MemoryCache>, interval: Duration) -> Option<SweepTask> {
    let runtime = match Handle::try_current() {
        Ok(runtime) => runtime,
        Err(_) => {
            warn!("No Tokio runtime available, memory cache sweeping is disabled");
            return None;
        }
    };

    let interval = interval.max(MIN_SWEEP_INTERVAL);
    let token = CancellationToken::new();
    let cancelled = token.clone();

    let handle = runtime.spawn(async move {
        info!("Starting sweep task with interval of {:?}", interval);

        loop {
            tokio::select! {
                _ = cancelled.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            let Some(cache) = cache.upgrade() else {
                break;
            };
            let report = cache.sweep();
            drop(cache);

            if report.removed() > 0 {
                info!(
                    "Sweep: expired {}, trimmed {}, orphaned {} entries",
                    report.expired, report.trimmed, report.orphaned
                );
            } else {
                debug!("Sweep: nothing to remove");
            }
        }

        debug!("Sweep task stopped");
    });

    Some(SweepTask { token, handle })
}
