//! Per-tick flight simulation, proximity enforcement and flight completion.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use flight_core::{
    scan_proximity, ActiveFlight, AlertLevel, ApplicationStatus, DemoTransition, ProximityAlert,
    RestrictedZone, StepOutcome,
};

use super::{
    FlightController, LIFECYCLE_NOTIFY_TIMEOUT, POSITION_NOTIFY_TIMEOUT, SYSTEM_SHUTDOWN,
};

const COMPLETED: &str = "completed";
const RESTRICTED_ZONE: &str = "restricted_zone";

impl FlightController {
    /// Advance every active flight by one tick. Flights are processed concurrently.
    pub async fn simulation_tick(&self) {
        let flights: Vec<ActiveFlight> = self.active_flights.read().await.values().cloned().collect();
        if flights.is_empty() {
            return;
        }

        let zones = self.zones().await;
        let now = self.now();
        join_all(
            flights
                .into_iter()
                .map(|flight| self.tick_flight(flight, &zones, now)),
        )
        .await;
    }

    async fn tick_flight(&self, mut flight: ActiveFlight, zones: &[RestrictedZone], now: DateTime<Utc>) {
        let application_id = flight.application_id;

        if let Some(transition) =
            flight.demo_transition(now, &self.config.rules, self.config.flight_speed_mps)
        {
            if !self.write_back(&flight).await {
                return;
            }
            match transition {
                DemoTransition::Paused => {
                    let reason = format!(
                        "Demo pause for {} seconds",
                        self.config.rules.demo_pause_duration.as_secs()
                    );
                    info!(application_id, "Demo flight paused");
                    self.deliver(
                        "flight_paused",
                        application_id,
                        LIFECYCLE_NOTIFY_TIMEOUT,
                        self.notifier.notify_flight_paused(&flight, &reason),
                    )
                    .await;
                }
                DemoTransition::Resumed => {
                    info!(application_id, "Demo flight resumed");
                    self.deliver(
                        "flight_resumed",
                        application_id,
                        LIFECYCLE_NOTIFY_TIMEOUT,
                        self.notifier
                            .notify_flight_resumed(&flight, "Demo pause completed"),
                    )
                    .await;
                }
            }
            return;
        }

        if flight.is_paused() {
            return;
        }

        let outcome = flight.advance(&self.simulator, &self.config.rules, now);
        if let StepOutcome::WaypointReached { index } = outcome {
            debug!(application_id, waypoint = index, "Waypoint reached");
        }

        // The arrival sample is checked too: a destination may sit inside the stop distance.
        let alerts = scan_proximity(
            flight.position.lat,
            flight.position.lon,
            zones,
            &self.config.rules,
        );
        if let Some(danger) = alerts.iter().find(|alert| alert.level == AlertLevel::Danger) {
            self.abort_for_zone(flight, danger).await;
            return;
        }
        if outcome == StepOutcome::Completed {
            self.complete_flight(flight).await;
            return;
        }
        for warning in &alerts {
            self.send_proximity_alert(&flight, warning).await;
        }

        if !self.write_back(&flight).await {
            return;
        }

        if let Err(err) = self.store.save_drone_position(&flight.position).await {
            warn!(application_id, error = %format!("{:#}", err), "Failed to persist drone position");
        }
        self.deliver(
            "position",
            application_id,
            POSITION_NOTIFY_TIMEOUT,
            self.notifier.update_drone_position(&flight.position),
        )
        .await;

        debug!(
            application_id,
            lat = flight.position.lat,
            lon = flight.position.lon,
            progress = flight.position.route_progress,
            "Position updated"
        );
    }

    /// Store the updated flight. False if it left the active set meanwhile.
    async fn write_back(&self, flight: &ActiveFlight) -> bool {
        match self
            .active_flights
            .write()
            .await
            .get_mut(&flight.application_id)
        {
            Some(slot) => {
                *slot = flight.clone();
                true
            }
            None => false,
        }
    }

    /// Remove a flight from the active set. False if another path already did.
    async fn take_flight(&self, flight: &ActiveFlight) -> bool {
        self.active_flights
            .write()
            .await
            .remove(&flight.application_id)
            .is_some()
    }

    async fn send_proximity_alert(&self, flight: &ActiveFlight, alert: &ProximityAlert) {
        if !self.first_alert(flight.application_id, alert.zone.id, alert.level) {
            return;
        }
        warn!(
            application_id = flight.application_id,
            zone = %alert.zone.name,
            level = alert.level.as_str(),
            distance_m = alert.distance_to_border_m,
            "Drone close to restricted zone"
        );
        self.deliver(
            "zone_proximity",
            flight.application_id,
            LIFECYCLE_NOTIFY_TIMEOUT,
            self.notifier.notify_restricted_zone_proximity(
                flight.application_id,
                flight.drone_id,
                &alert.zone,
                alert.level,
                alert.distance_to_border_m,
                &flight.position,
            ),
        )
        .await;
    }

    async fn complete_flight(&self, mut flight: ActiveFlight) {
        if !self.take_flight(&flight).await {
            return;
        }
        let application_id = flight.application_id;
        flight.status = ApplicationStatus::Completed;
        info!(application_id, drone_id = flight.drone_id, "Flight completed");

        if let Err(err) = self.store.save_drone_position(&flight.position).await {
            warn!(application_id, error = %format!("{:#}", err), "Failed to persist final position");
        }
        self.deliver(
            "position",
            application_id,
            POSITION_NOTIFY_TIMEOUT,
            self.notifier.update_drone_position(&flight.position),
        )
        .await;

        self.persist_status(application_id, ApplicationStatus::Completed, None)
            .await;
        self.send_status(
            application_id,
            ApplicationStatus::Completed,
            "Flight completed successfully. Drone has reached destination.",
            None,
        )
        .await;
        self.deliver(
            "flight_completed",
            application_id,
            LIFECYCLE_NOTIFY_TIMEOUT,
            self.notifier.notify_flight_completed(&flight, COMPLETED),
        )
        .await;

        self.clear_alerts(application_id);
    }

    /// Cancel a flight that came within the stop distance of a zone.
    ///
    /// The offending position is neither persisted nor published as a position update.
    async fn abort_for_zone(&self, mut flight: ActiveFlight, alert: &ProximityAlert) {
        if !self.take_flight(&flight).await {
            return;
        }
        let application_id = flight.application_id;
        flight.status = ApplicationStatus::Cancelled;

        let reason = format!(
            "Flight automatically stopped: drone approached within {:.1} meters of restricted zone '{}'",
            alert.distance_to_border_m, alert.zone.name
        );
        warn!(
            application_id,
            zone = %alert.zone.name,
            distance_m = alert.distance_to_border_m,
            "Flight stopped near restricted zone"
        );

        self.persist_status(application_id, ApplicationStatus::Cancelled, Some(&reason))
            .await;
        self.send_status(
            application_id,
            ApplicationStatus::Cancelled,
            "Flight stopped for safety reasons",
            Some(&reason),
        )
        .await;
        self.send_proximity_alert(&flight, alert).await;
        self.deliver(
            "flight_completed",
            application_id,
            LIFECYCLE_NOTIFY_TIMEOUT,
            self.notifier.notify_flight_completed(&flight, RESTRICTED_ZONE),
        )
        .await;

        self.clear_alerts(application_id);
    }

    /// End a flight outside the normal simulation path.
    pub(crate) async fn force_complete(&self, mut flight: ActiveFlight, reason: &str) {
        let application_id = flight.application_id;
        let message = match reason {
            SYSTEM_SHUTDOWN => "Flight cancelled due to system shutdown".to_string(),
            other => format!("Flight cancelled: {}", other),
        };
        flight.status = ApplicationStatus::Cancelled;
        info!(application_id, reason, "Force-completing flight");

        self.persist_status(application_id, ApplicationStatus::Cancelled, Some(reason))
            .await;
        self.send_status(
            application_id,
            ApplicationStatus::Cancelled,
            &message,
            Some(reason),
        )
        .await;
        self.deliver(
            "flight_completed",
            application_id,
            LIFECYCLE_NOTIFY_TIMEOUT,
            self.notifier.notify_flight_completed(&flight, reason),
        )
        .await;

        self.clear_alerts(application_id);
    }
}
