//! Connectivity probe: periodically pings the cloud health endpoint and
//! flips the terminal's online flag. The flag's offline→online edge is a
//! sync trigger; while it stays false every sync call is a no-op.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::cloud::{CloudError, CloudResult};
use crate::core::TerminalState;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ConnectivityMonitor {
    state: TerminalState,
    client: reqwest::Client,
    interval: Duration,
    shutdown: CancellationToken,
}

impl ConnectivityMonitor {
    pub fn new(state: TerminalState, shutdown: CancellationToken) -> CloudResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| CloudError::Request(format!("failed to build probe client: {e}")))?;
        let interval = Duration::from_secs(state.config().probe_interval_secs);
        Ok(Self {
            state,
            client,
            interval,
            shutdown,
        })
    }

    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "ConnectivityMonitor started");
        loop {
            let online = self.probe().await;
            if online != self.state.is_online() {
                if online {
                    tracing::info!("cloud reachable, going online");
                } else {
                    tracing::warn!("cloud unreachable, going offline");
                }
            }
            self.state.set_online(online);

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("ConnectivityMonitor shutting down");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    async fn probe(&self) -> bool {
        let url = format!("{}/healthz", self.state.config().cloud_url.trim_end_matches('/'));
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "connectivity probe failed");
                false
            }
        }
    }
}
