//! Restricted zone refresh loop.
//!
//! The cache is loaded once at startup; this loop reloads it on a fixed period.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant};

use crate::controller::FlightController;

pub async fn run_zone_refresh_loop(
    controller: Arc<FlightController>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let period = controller.config().zone_refresh_interval;
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Zone refresh loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                controller.refresh_zones().await;
            }
        }
    }
}
