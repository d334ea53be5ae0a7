//! Per-flight lifecycle: the live record of an approved, executing application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::{ApplicationId, ApplicationStatus, DronePosition, FlightApplication, RoutePoint};
use crate::rules::FlightRules;
use crate::simulator::PositionSimulator;
use crate::spatial::haversine_distance;

#[derive(Debug, Error)]
pub enum FlightError {
    #[error("route needs at least 2 points, got {0}")]
    RouteTooShort(usize),
}

/// Simulation sub-state of an executing flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum FlightState {
    Active,
    Paused { since: DateTime<Utc> },
}

/// Demo pause cycle transition taken on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoTransition {
    Paused,
    Resumed,
}

/// Result of advancing a flight by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// Flight is paused, nothing moved
    Held,
    Moved { distance_to_target_m: f64 },
    WaypointReached { index: usize },
    /// Last waypoint reached, progress is 100
    Completed,
}

/// Live simulation record for one flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveFlight {
    pub application_id: ApplicationId,
    pub drone_id: i64,
    pub pilot_id: i64,
    pub route: Vec<RoutePoint>,
    /// Index into `route` of the waypoint being flown to
    pub current_waypoint: usize,
    pub start_time: DateTime<Utc>,
    pub estimated_end_time: DateTime<Utc>,
    pub status: ApplicationStatus,
    pub position: DronePosition,
    pub state: FlightState,
    #[serde(default)]
    pub last_resumed_at: Option<DateTime<Utc>>,
    /// One-shot: cleared after the first demo pause/resume cycle
    pub demo_mode: bool,
}

impl ActiveFlight {
    /// Create the flight record for an approved application.
    ///
    /// The drone starts on the first route point, flying toward the second.
    pub fn launch(
        application: &FlightApplication,
        route: Vec<RoutePoint>,
        simulator: &PositionSimulator,
        now: DateTime<Utc>,
    ) -> Result<Self, FlightError> {
        if route.len() < 2 {
            return Err(FlightError::RouteTooShort(route.len()));
        }

        let origin = &route[0];
        let position = DronePosition {
            application_id: application.id,
            drone_id: application.drone_id,
            lat: origin.lat,
            lon: origin.lon,
            altitude_m: origin.altitude_m,
            speed_mps: 0.0,
            heading_deg: 0.0,
            timestamp: now,
            route_progress: 0.0,
        };
        let estimated_end_time = chrono::Duration::from_std(simulator.estimated_duration(&route))
            .ok()
            .and_then(|duration| now.checked_add_signed(duration))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Ok(Self {
            application_id: application.id,
            drone_id: application.drone_id,
            pilot_id: application.pilot_id,
            route,
            current_waypoint: 1,
            start_time: now,
            estimated_end_time,
            status: ApplicationStatus::Executing,
            position,
            state: FlightState::Active,
            last_resumed_at: None,
            demo_mode: application.tested,
        })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, FlightState::Paused { .. })
    }

    pub fn estimated_duration(&self) -> Duration {
        (self.estimated_end_time - self.start_time)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Drive the one-shot demo pause cycle.
    ///
    /// A demo flight pauses once `demo_pause_after` has elapsed since start,
    /// holds for `demo_pause_duration`, then resumes with demo mode disabled.
    pub fn demo_transition(
        &mut self,
        now: DateTime<Utc>,
        rules: &FlightRules,
        groundspeed_mps: f64,
    ) -> Option<DemoTransition> {
        match self.state {
            FlightState::Active
                if self.demo_mode && elapsed(self.start_time, now) >= rules.demo_pause_after =>
            {
                self.state = FlightState::Paused { since: now };
                self.position.speed_mps = 0.0;
                Some(DemoTransition::Paused)
            }
            FlightState::Paused { since } if elapsed(since, now) >= rules.demo_pause_duration => {
                self.state = FlightState::Active;
                self.last_resumed_at = Some(now);
                self.demo_mode = false;
                self.position.speed_mps = groundspeed_mps;
                Some(DemoTransition::Resumed)
            }
            _ => None,
        }
    }

    /// Advance the simulated position by one tick.
    pub fn advance(
        &mut self,
        simulator: &PositionSimulator,
        rules: &FlightRules,
        now: DateTime<Utc>,
    ) -> StepOutcome {
        if self.is_paused() {
            return StepOutcome::Held;
        }
        let Some(target) = self.route.get(self.current_waypoint).cloned() else {
            self.position.route_progress = 100.0;
            return StepOutcome::Completed;
        };

        let mut next = simulator.step(&self.position, &target, now);
        let distance_to_target_m = haversine_distance(next.lat, next.lon, target.lat, target.lon);

        let mut reached = None;
        if distance_to_target_m < rules.waypoint_arrival_m {
            reached = Some(self.current_waypoint);
            self.current_waypoint += 1;
            if self.current_waypoint >= self.route.len() {
                next.lat = target.lat;
                next.lon = target.lon;
                next.altitude_m = target.altitude_m;
                next.route_progress = 100.0;
                self.position = next;
                return StepOutcome::Completed;
            }
        }

        next.route_progress = PositionSimulator::route_progress(&self.route, next.lat, next.lon)
            .max(self.position.route_progress);
        self.position = next;

        match reached {
            Some(index) => StepOutcome::WaypointReached { index },
            None => StepOutcome::Moved {
                distance_to_target_m,
            },
        }
    }
}

fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or(Duration::ZERO)
}
