//! Periodic license replenishment

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use super::service::LicenseService;

/// Background task that keeps every category stocked
///
/// Ticks run one after another on a single task; a slow pass delays the
/// next tick instead of overlapping it.
#[derive(Debug, Clone)]
pub struct Replenisher {
    service: Arc<LicenseService>,
    interval: Duration,
}

impl Replenisher {
    pub fn new(service: Arc<LicenseService>, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Start ticking; the first pass runs one interval from now
    pub fn spawn(self) -> JoinHandle<()> {
        info!(interval_secs = self.interval.as_secs(), "Starting license replenisher");

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.tick().await;
            }
        })
    }

    async fn tick(&self) {
        // Failures are logged and retried on the next tick
        if let Err(e) = self.service.maintain().await {
            error!(error = %e, "License replenishment failed");
        }
    }
}
