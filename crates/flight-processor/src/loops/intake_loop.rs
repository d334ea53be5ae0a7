//! Application intake loop.
//!
//! Polls the store for pending applications and dispatches each to its own pipeline task.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};

use crate::controller::FlightController;

pub async fn run_intake_loop(controller: Arc<FlightController>, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = interval(controller.config().intake_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Intake loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                controller.poll_pending().await;
            }
        }
    }
}
