//! Background maintenance task.
//!
//! Drives `MemoryCoordinator::tick` on the configured consolidation
//! interval. The first tick fires one full interval after start; missed
//! ticks are skipped rather than bursted. When the configured interval
//! changes the timer is re-armed from that moment.

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::coordinator::MemoryCoordinator;

/// Handle to the running maintenance task
pub struct MaintenanceHandle {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl MaintenanceHandle {
    /// Spawn the loop.
    ///
    /// The task holds only a weak reference to the coordinator and exits
    /// on its own once the coordinator is dropped.
    pub(crate) fn spawn(
        coordinator: Weak<MemoryCoordinator>,
        mut interval_rx: watch::Receiver<Duration>,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let mut period = *interval_rx.borrow_and_update();

        info!(interval_seconds = period.as_secs_f64(), "Starting memory maintenance");

        let handle = tokio::spawn(async move {
            let mut ticker = new_ticker(period);

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown_rx.changed() => break,

                    changed = interval_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let updated = *interval_rx.borrow_and_update();
                        if updated != period {
                            info!(
                                previous_seconds = period.as_secs_f64(),
                                interval_seconds = updated.as_secs_f64(),
                                "Maintenance interval changed"
                            );
                            period = updated;
                            ticker = new_ticker(period);
                        }
                    }

                    _ = ticker.tick() => {
                        let Some(coordinator) = coordinator.upgrade() else {
                            debug!("Coordinator dropped, stopping maintenance");
                            break;
                        };
                        coordinator.tick().await;
                    }
                }
            }

            info!("Memory maintenance stopped");
        });

        Self { shutdown_tx, handle }
    }

    /// Signal the loop and wait for it to exit. A tick in progress finishes first.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Maintenance task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

fn new_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}
