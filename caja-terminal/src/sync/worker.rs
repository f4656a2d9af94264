//! Background worker that drives sync cycles.
//!
//! Triggers: once at startup, a periodic interval, and the offline→online
//! transition. Overlapping triggers are suppressed by the engine's busy
//! flag, so at most one cycle is ever in flight.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::sync::SyncEngine;

pub struct SyncWorker {
    engine: Arc<SyncEngine>,
    interval: Duration,
    online: watch::Receiver<bool>,
    shutdown: CancellationToken,
}

impl SyncWorker {
    pub fn new(
        engine: Arc<SyncEngine>,
        interval: Duration,
        online: watch::Receiver<bool>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            engine,
            interval,
            online,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "SyncWorker started");

        // Reconcile whatever the previous session left pending.
        self.engine.sync_cycle().await;

        let mut interval = tokio::time::interval(self.interval);
        interval.tick().await; // skip immediate tick

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("SyncWorker shutting down");
                    // One last opportunistic flush; offline makes it a no-op.
                    self.engine.sync_cycle().await;
                    break;
                }

                _ = interval.tick() => {
                    self.engine.sync_cycle().await;
                }

                changed = self.online.changed() => {
                    match changed {
                        Ok(()) => {
                            if *self.online.borrow_and_update() {
                                tracing::info!("connectivity restored, reconciling");
                                self.engine.sync_cycle().await;
                            }
                        }
                        Err(_) => {
                            tracing::info!("connectivity channel closed, SyncWorker stopping");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("SyncWorker stopped");
    }
}
