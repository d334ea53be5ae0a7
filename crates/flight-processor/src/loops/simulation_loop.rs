//! Position simulation loop.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};

use crate::controller::FlightController;

pub async fn run_simulation_loop(
    controller: Arc<FlightController>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(controller.config().position_update_interval);
    // Slow ticks (notifier timeouts) delay the schedule instead of bursting.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Simulation loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                controller.simulation_tick().await;
            }
        }
    }
}
