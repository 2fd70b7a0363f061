use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::engine::PlacementEngine;

const MIN_PERIOD: Duration = Duration::from_millis(10);

/// Background task that refreshes the board on a fixed interval.
///
/// Stops when [`RefreshPoller::stop`] is called or the poller is dropped.
/// Moves already in flight are separate tasks and keep running.
pub struct RefreshPoller {
    task_handle: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshPoller {
    pub fn spawn(engine: Arc<PlacementEngine>, period: Duration) -> Self {
        let period = period.max(MIN_PERIOD);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match engine.refresh().await {
                    Ok(report) => tracing::trace!(
                        "Refreshed board: {} adopted, {} inserted, {} removed",
                        report.adopted.len(),
                        report.inserted.len(),
                        report.removed.len()
                    ),
                    Err(e) => tracing::warn!("Board refresh failed: {}", e),
                }
            }
        });
        tracing::info!("Started board refresh every {:?}", period);

        Self {
            task_handle: Mutex::new(Some(handle)),
        }
    }

    pub fn stop(&self) {
        if let Some(handle) = self.task_handle.lock().take() {
            handle.abort();
            tracing::info!("Stopped board refresh");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for RefreshPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
